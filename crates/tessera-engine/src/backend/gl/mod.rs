//! GL adapters (GLSL ES 1.00 and 3.00) over `glow`.
//!
//! GL executes calls in submission order, so unlike the wgpu adapter one streaming buffer is
//! enough for per-call light and shadow data. Instanced sprite runs address their slice by
//! attribute pointer offset, which also works without base-instance support.

mod caps;
mod program;

pub use caps::{check_support, Capabilities, GlVersion, Instancing};

use std::collections::HashMap;

use glow::HasContext;

use crate::coords::{ColorRgba, SurfaceSize};
use crate::error::{RenderError, RenderResult};
use crate::shader::dialect::{
    FULLSCREEN_ATTRIBUTES, LIGHT_ATTRIBUTES, SHADOW_ATTRIBUTES, SPRITE_ATTRIBUTES,
};
use crate::shader::{ProgramSource, MAX_CHANNELS};

use super::{
    missing_target, Backend, BackendKind, BlendMode, BufferId, DrawCall, LightInstance, ProgramDesc,
    SpriteInstance, SpriteMode, Target, TextureData,
};

use program::{apply_blend, EffectProgram, FixedProgram};

const QUAD_CORNERS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Float counts of the sprite instance attributes at locations 1..=6.
const SPRITE_COMPONENTS: [i32; 6] = [2, 2, 2, 2, 4, 4];
/// (components, byte offset) of the light instance attributes at locations 1..=4.
const LIGHT_COMPONENTS: [(i32, i32); 4] = [(2, 0), (2, 8), (2, 16), (4, 32)];

struct RenderTarget {
    fbo: glow::NativeFramebuffer,
    texture: glow::NativeTexture,
    size: SurfaceSize,
}

struct InstanceBuffer {
    buffer: glow::NativeBuffer,
    capacity: usize,
}

/// OpenGL / OpenGL ES adapter.
///
/// The context must stay current on the calling thread for the backend's whole lifetime;
/// every `unsafe` GL call below relies on that.
pub struct GlBackend {
    gl: glow::Context,
    kind: BackendKind,
    caps: Capabilities,
    vao: Option<glow::NativeVertexArray>,

    sprite_color: FixedProgram,
    sprite_mask: FixedProgram,
    light: FixedProgram,
    shadow: FixedProgram,

    quad_vbo: glow::NativeBuffer,
    quad_ibo: glow::NativeBuffer,
    stream_vbo: glow::NativeBuffer,
    empty_texture: glow::NativeTexture,

    atlases: HashMap<String, glow::NativeTexture>,
    targets: Vec<RenderTarget>,
    surface: SurfaceSize,
    buffers: HashMap<BufferId, InstanceBuffer>,
    next_buffer: u32,
    programs: HashMap<String, EffectProgram>,
    view: [f32; 4],
}

fn gl_error(what: &str, e: String) -> RenderError {
    RenderError::Surface(format!("{what} failed: {e}"))
}

fn glsl(name: &str, source: &ProgramSource) -> RenderResult<(String, String)> {
    match source {
        ProgramSource::Glsl { vertex, fragment } => Ok((vertex.clone(), fragment.clone())),
        ProgramSource::Wgsl(_) => Err(RenderError::ShaderCompile {
            name: name.to_string(),
            log: "GL programs must be GLSL".to_string(),
        }),
    }
}

impl GlBackend {
    /// Wraps a current context after checking it can run `kind`.
    pub fn new(kind: BackendKind, gl: glow::Context, size: SurfaceSize) -> RenderResult<Self> {
        let version = GlVersion::from(gl.version());
        let caps = check_support(kind, version, gl.supported_extensions())
            .map_err(|reason| RenderError::UnsupportedBackend { kind, reason })?;
        log::info!(
            "GL {}.{}{} ({:?} instancing)",
            version.major,
            version.minor,
            if version.embedded { " ES" } else { "" },
            caps.instancing
        );

        let dialect = kind.dialect();
        let fixed = |name: &str, source: ProgramSource, attributes: &[&str]| {
            let (vs, fs) = glsl(name, &source)?;
            FixedProgram::new(&gl, name, &vs, &fs, attributes)
        };
        let sprite_color =
            fixed("sprite", dialect.sprite_program(SpriteMode::Color), &SPRITE_ATTRIBUTES[..])?;
        let sprite_mask =
            fixed("sprite mask", dialect.sprite_program(SpriteMode::Mask), &SPRITE_ATTRIBUTES[..])?;
        let light = fixed("light", dialect.light_program(), &LIGHT_ATTRIBUTES[..])?;
        let shadow = fixed("shadow", dialect.shadow_program(), &SHADOW_ATTRIBUTES[..])?;

        // SAFETY: see type docs.
        let (vao, quad_vbo, quad_ibo, stream_vbo, empty_texture) = unsafe {
            let vao = if caps.vertex_arrays {
                let vao = gl.create_vertex_array().map_err(|e| gl_error("create_vertex_array", e))?;
                gl.bind_vertex_array(Some(vao));
                Some(vao)
            } else {
                None
            };

            let quad_vbo = gl.create_buffer().map_err(|e| gl_error("create_buffer", e))?;
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(quad_vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&QUAD_CORNERS),
                glow::STATIC_DRAW,
            );

            let quad_ibo = gl.create_buffer().map_err(|e| gl_error("create_buffer", e))?;
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(quad_ibo));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&QUAD_INDICES),
                glow::STATIC_DRAW,
            );

            let stream_vbo = gl.create_buffer().map_err(|e| gl_error("create_buffer", e))?;
            let empty_texture = create_texture(&gl, caps, 1, 1, Some(&[0u8; 4][..]), glow::NEAREST)?;
            (vao, quad_vbo, quad_ibo, stream_vbo, empty_texture)
        };

        Ok(Self {
            gl,
            kind,
            caps,
            vao,
            sprite_color,
            sprite_mask,
            light,
            shadow,
            quad_vbo,
            quad_ibo,
            stream_vbo,
            empty_texture,
            atlases: HashMap::new(),
            targets: Vec::new(),
            surface: size,
            buffers: HashMap::new(),
            next_buffer: 0,
            programs: HashMap::new(),
            view: [0.0, 0.0, 1.0, 1.0],
        })
    }

    /// Binds `target` as the draw framebuffer and sets the viewport to its size.
    fn bind_target(&self, target: Target) -> RenderResult<()> {
        let (fbo, size) = match target {
            Target::Surface => (None, self.surface),
            Target::Offscreen(i) => {
                let t = self.targets.get(i).ok_or_else(|| missing_target(self.targets.len(), i))?;
                (Some(t.fbo), t.size)
            }
        };
        // SAFETY: see type docs.
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, fbo);
            self.gl.viewport(0, 0, size.width as i32, size.height as i32);
        }
        Ok(())
    }

    /// Binds the unit quad to location 0 and the index buffer.
    fn bind_quad(&self) {
        let gl = &self.gl;
        // SAFETY: see type docs.
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.quad_vbo));
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, 8, 0);
            gl.vertex_attrib_divisor(0, 0);
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(self.quad_ibo));
        }
    }

    /// Points instance attributes `1..` at `buffer`, starting `base` bytes in.
    fn bind_instance_attributes(&self, buffer: glow::NativeBuffer, stride: i32, base: i32,
        layout: &[(i32, i32)]) {
        let gl = &self.gl;
        // SAFETY: see type docs.
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            for (i, &(components, offset)) in layout.iter().enumerate() {
                let loc = i as u32 + 1;
                gl.enable_vertex_attrib_array(loc);
                gl.vertex_attrib_pointer_f32(loc, components, glow::FLOAT, false, stride,
                    base + offset);
                gl.vertex_attrib_divisor(loc, 1);
            }
        }
    }

    /// Disables every attribute above location 0 and resets divisors.
    fn reset_attributes(&self, count: u32) {
        // SAFETY: see type docs.
        unsafe {
            for loc in 1..=count {
                self.gl.vertex_attrib_divisor(loc, 0);
                self.gl.disable_vertex_attrib_array(loc);
            }
        }
    }

    fn delete_targets(&mut self) {
        // SAFETY: see type docs.
        unsafe {
            for t in self.targets.drain(..) {
                self.gl.delete_framebuffer(t.fbo);
                self.gl.delete_texture(t.texture);
            }
        }
    }
}

fn sprite_layout() -> [(i32, i32); 6] {
    let mut out = [(0, 0); 6];
    let mut offset = 0;
    for (slot, &n) in out.iter_mut().zip(SPRITE_COMPONENTS.iter()) {
        *slot = (n, offset);
        offset += n * 4;
    }
    out
}

/// Creates an RGBA texture with clamped edges and `filter` sampling.
fn create_texture(
    gl: &glow::Context,
    caps: Capabilities,
    width: u32,
    height: u32,
    pixels: Option<&[u8]>,
    filter: u32,
) -> RenderResult<glow::NativeTexture> {
    let internal = if caps.sized_formats { glow::RGBA8 } else { glow::RGBA };
    // SAFETY: callers hold a current context.
    unsafe {
        let tex = gl.create_texture().map_err(|e| gl_error("create_texture", e))?;
        gl.bind_texture(glow::TEXTURE_2D, Some(tex));
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            internal as i32,
            width as i32,
            height as i32,
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            pixels,
        );
        gl.bind_texture(glow::TEXTURE_2D, None);
        Ok(tex)
    }
}

fn create_render_target(
    gl: &glow::Context,
    caps: Capabilities,
    index: usize,
    size: SurfaceSize,
) -> RenderResult<RenderTarget> {
    let size = SurfaceSize::new(size.width.max(1), size.height.max(1));
    let texture = create_texture(gl, caps, size.width, size.height, None, glow::LINEAR)?;
    // SAFETY: callers hold a current context.
    unsafe {
        let fbo = gl.create_framebuffer().map_err(|e| gl_error("create_framebuffer", e))?;
        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
        gl.framebuffer_texture_2d(
            glow::FRAMEBUFFER,
            glow::COLOR_ATTACHMENT0,
            glow::TEXTURE_2D,
            Some(texture),
            0,
        );
        let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        if status != glow::FRAMEBUFFER_COMPLETE {
            gl.delete_framebuffer(fbo);
            gl.delete_texture(texture);
            return Err(RenderError::Surface(format!(
                "offscreen target {index} incomplete: 0x{status:x}"
            )));
        }
        Ok(RenderTarget { fbo, texture, size })
    }
}

impl Backend for GlBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn load_texture(&mut self, texture: &TextureData) -> RenderResult<()> {
        texture.validate()?;
        let tex = create_texture(
            &self.gl,
            self.caps,
            texture.width,
            texture.height,
            Some(&texture.pixels),
            glow::NEAREST,
        )?;
        if let Some(old) = self.atlases.insert(texture.name.clone(), tex) {
            // SAFETY: see type docs.
            unsafe { self.gl.delete_texture(old) };
        }
        Ok(())
    }

    fn compile_program(&mut self, name: &str, desc: &ProgramDesc) -> RenderResult<()> {
        let (vs, fs) = glsl(name, &desc.source)?;
        let linked = program::link(&self.gl, name, &vs, &fs, &FULLSCREEN_ATTRIBUTES)?;
        let effect = EffectProgram::new(&self.gl, linked, &desc.uniforms, desc.blend);
        if let Some(old) = self.programs.insert(name.to_string(), effect) {
            // SAFETY: see type docs.
            unsafe { self.gl.delete_program(old.program) };
        }
        Ok(())
    }

    fn configure_targets(&mut self, surface: SurfaceSize, targets: &[SurfaceSize])
    -> RenderResult<()> {
        self.delete_targets();
        self.surface = surface;
        for (i, &size) in targets.iter().enumerate() {
            let target = create_render_target(&self.gl, self.caps, i, size)?;
            self.targets.push(target);
        }
        log::debug!("configured {} offscreen targets for {surface:?}", self.targets.len());
        Ok(())
    }

    fn create_instance_buffer(&mut self, capacity: usize) -> RenderResult<BufferId> {
        let bytes = (capacity.max(1) * size_of::<SpriteInstance>()) as i32;
        // SAFETY: see type docs.
        let buffer = unsafe {
            let buffer = self.gl.create_buffer().map_err(|e| gl_error("create_buffer", e))?;
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl.buffer_data_size(glow::ARRAY_BUFFER, bytes, glow::DYNAMIC_DRAW);
            buffer
        };
        let id = BufferId(self.next_buffer);
        self.next_buffer = self.next_buffer.wrapping_add(1);
        self.buffers.insert(id, InstanceBuffer { buffer, capacity });
        Ok(id)
    }

    fn write_instances(&mut self, buffer: BufferId, instances: &[SpriteInstance])
    -> RenderResult<()> {
        let Some(target) = self.buffers.get(&buffer) else {
            log::warn!("write to unknown instance buffer {buffer:?}");
            return Ok(());
        };
        let n = instances.len().min(target.capacity);
        // SAFETY: see type docs.
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(target.buffer));
            self.gl.buffer_sub_data_u8_slice(
                glow::ARRAY_BUFFER,
                0,
                bytemuck::cast_slice(&instances[..n]),
            );
        }
        Ok(())
    }

    fn free_instance_buffer(&mut self, buffer: BufferId) {
        match self.buffers.remove(&buffer) {
            // SAFETY: see type docs.
            Some(b) => unsafe { self.gl.delete_buffer(b.buffer) },
            None => log::warn!("free of unknown instance buffer {buffer:?}"),
        }
    }

    fn begin_frame(&mut self, view: [f32; 4]) -> RenderResult<()> {
        self.view = view;
        if let Some(vao) = self.vao {
            // SAFETY: see type docs.
            unsafe { self.gl.bind_vertex_array(Some(vao)) };
        }
        Ok(())
    }

    fn clear(&mut self, target: Target, color: ColorRgba) -> RenderResult<()> {
        self.bind_target(target)?;
        // SAFETY: see type docs.
        unsafe {
            self.gl.clear_color(color.r, color.g, color.b, color.a);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
        Ok(())
    }

    fn draw_sprites(
        &mut self,
        target: Target,
        mode: SpriteMode,
        buffer: BufferId,
        calls: &[DrawCall],
    ) -> RenderResult<()> {
        if let Some(missing) = calls.iter().find(|c| !self.atlases.contains_key(&c.texture)) {
            return Err(RenderError::UnknownTexture(missing.texture.clone()));
        }
        let Some(instances) = self.buffers.get(&buffer).map(|b| b.buffer) else {
            log::warn!("draw from unknown instance buffer {buffer:?}");
            return Ok(());
        };
        if calls.is_empty() {
            return Ok(());
        }

        self.bind_target(target)?;
        let program = match mode {
            SpriteMode::Color => &self.sprite_color,
            SpriteMode::Mask => &self.sprite_mask,
        };
        program.use_with_view(&self.gl, self.view);
        apply_blend(&self.gl, BlendMode::Alpha);
        self.bind_quad();

        let stride = size_of::<SpriteInstance>() as i32;
        let layout = sprite_layout();
        for call in calls {
            let Some(&atlas) = self.atlases.get(&call.texture) else { continue };
            self.bind_instance_attributes(instances, stride, call.instance_offset as i32 * stride,
                &layout);
            // SAFETY: see type docs.
            unsafe {
                self.gl.active_texture(glow::TEXTURE0);
                self.gl.bind_texture(glow::TEXTURE_2D, Some(atlas));
                self.gl.draw_elements_instanced(
                    glow::TRIANGLES,
                    QUAD_INDICES.len() as i32,
                    glow::UNSIGNED_SHORT,
                    0,
                    call.instance_count as i32,
                );
            }
        }
        self.reset_attributes(layout.len() as u32);
        Ok(())
    }

    fn draw_light(&mut self, target: Target, light: &LightInstance) -> RenderResult<()> {
        self.bind_target(target)?;
        self.light.use_with_view(&self.gl, self.view);
        apply_blend(&self.gl, BlendMode::Replace);
        self.bind_quad();

        // SAFETY: see type docs.
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.stream_vbo));
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::bytes_of(light),
                glow::STREAM_DRAW,
            );
        }
        self.bind_instance_attributes(
            self.stream_vbo,
            size_of::<LightInstance>() as i32,
            0,
            &LIGHT_COMPONENTS,
        );
        // SAFETY: see type docs.
        unsafe {
            self.gl.draw_elements_instanced(
                glow::TRIANGLES,
                QUAD_INDICES.len() as i32,
                glow::UNSIGNED_SHORT,
                0,
                1,
            );
        }
        self.reset_attributes(LIGHT_COMPONENTS.len() as u32);
        Ok(())
    }

    fn draw_shadows(&mut self, target: Target, triangles: &[[f32; 2]]) -> RenderResult<()> {
        if triangles.is_empty() {
            return Ok(());
        }
        self.bind_target(target)?;
        self.shadow.use_with_view(&self.gl, self.view);
        apply_blend(&self.gl, BlendMode::Replace);

        // SAFETY: see type docs.
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.stream_vbo));
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(triangles),
                glow::STREAM_DRAW,
            );
            self.gl.enable_vertex_attrib_array(0);
            self.gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, 8, 0);
            self.gl.vertex_attrib_divisor(0, 0);
            self.gl.draw_arrays(glow::TRIANGLES, 0, triangles.len() as i32);
        }
        Ok(())
    }

    fn run_program(
        &mut self,
        name: &str,
        inputs: &[usize],
        output: Target,
        uniforms: &[f32],
        clear: Option<ColorRgba>,
    ) -> RenderResult<()> {
        let program = self
            .programs
            .get(name)
            .ok_or_else(|| RenderError::UnknownShader(name.to_string()))?;

        let mut textures = [self.empty_texture; MAX_CHANNELS];
        for (c, &slot) in inputs.iter().take(MAX_CHANNELS).enumerate() {
            let t = self.targets.get(slot).ok_or_else(|| missing_target(self.targets.len(), slot))?;
            if output == Target::Offscreen(slot) {
                log::warn!("offscreen {slot} is both input and output; channel {c} reads empty");
                continue;
            }
            textures[c] = t.texture;
        }

        self.bind_target(output)?;
        let gl = &self.gl;
        // SAFETY: see type docs.
        unsafe {
            if let Some(c) = clear {
                gl.clear_color(c.r, c.g, c.b, c.a);
                gl.clear(glow::COLOR_BUFFER_BIT);
            }
            gl.use_program(Some(program.program));
            for (unit, &tex) in textures.iter().enumerate() {
                gl.active_texture(glow::TEXTURE0 + unit as u32);
                gl.bind_texture(glow::TEXTURE_2D, Some(tex));
            }
        }
        program.bind_channel_units(gl);
        program.upload(gl, uniforms);
        apply_blend(gl, program.blend);
        self.bind_quad();

        // SAFETY: see type docs.
        unsafe {
            self.gl.draw_elements(glow::TRIANGLES, QUAD_INDICES.len() as i32, glow::UNSIGNED_SHORT, 0);
            self.gl.active_texture(glow::TEXTURE0);
        }
        Ok(())
    }

    fn end_frame(&mut self) -> RenderResult<()> {
        // SAFETY: see type docs.
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.gl.flush();
        }
        Ok(())
    }
}

impl Drop for GlBackend {
    fn drop(&mut self) {
        self.delete_targets();
        // SAFETY: see type docs.
        unsafe {
            for (_, b) in self.buffers.drain() {
                self.gl.delete_buffer(b.buffer);
            }
            for (_, t) in self.atlases.drain() {
                self.gl.delete_texture(t);
            }
            for (_, p) in self.programs.drain() {
                self.gl.delete_program(p.program);
            }
            for p in [&self.sprite_color, &self.sprite_mask, &self.light, &self.shadow] {
                self.gl.delete_program(p.program);
            }
            self.gl.delete_buffer(self.quad_vbo);
            self.gl.delete_buffer(self.quad_ibo);
            self.gl.delete_buffer(self.stream_vbo);
            self.gl.delete_texture(self.empty_texture);
            if let Some(vao) = self.vao {
                self.gl.delete_vertex_array(vao);
            }
        }
    }
}
