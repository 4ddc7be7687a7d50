//! Program compilation and uniform upload for the GL adapters.

use glow::HasContext;

use crate::backend::BlendMode;
use crate::error::{RenderError, RenderResult};
use crate::shader::dialect::{channel_sampler_name, uniform_member_name};
use crate::shader::{ShaderType, UniformDesc, MAX_CHANNELS};

fn compile_error(name: &str, log: impl Into<String>) -> RenderError {
    RenderError::ShaderCompile { name: name.to_string(), log: log.into() }
}

/// Compiles and links `vertex` + `fragment`, binding `attributes[i]` to location `i`.
pub(super) fn link(
    gl: &glow::Context,
    name: &str,
    vertex: &str,
    fragment: &str,
    attributes: &[&str],
) -> RenderResult<glow::NativeProgram> {
    // SAFETY: the owning backend keeps its context current; every object created here is
    // deleted on the failure paths or owned by the returned program.
    unsafe {
        let mut shaders = Vec::with_capacity(2);
        for (stage, src) in [(glow::VERTEX_SHADER, vertex), (glow::FRAGMENT_SHADER, fragment)] {
            let shader = gl.create_shader(stage).map_err(|e| compile_error(name, e))?;
            gl.shader_source(shader, src);
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                let log = gl.get_shader_info_log(shader);
                gl.delete_shader(shader);
                for s in shaders {
                    gl.delete_shader(s);
                }
                return Err(compile_error(name, log));
            }
            shaders.push(shader);
        }

        let program = gl.create_program().map_err(|e| compile_error(name, e))?;
        for (i, attr) in attributes.iter().enumerate() {
            gl.bind_attrib_location(program, i as u32, attr);
        }
        for &s in &shaders {
            gl.attach_shader(program, s);
        }
        gl.link_program(program);
        for s in shaders {
            gl.detach_shader(program, s);
            gl.delete_shader(s);
        }

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(compile_error(name, log));
        }
        Ok(program)
    }
}

pub(super) fn uniform_location(
    gl: &glow::Context,
    program: glow::NativeProgram,
    name: &str,
) -> Option<glow::NativeUniformLocation> {
    // SAFETY: `program` is a live program of this context.
    unsafe { gl.get_uniform_location(program, name) }
}

/// A fixed program (sprite, light, shadow) with its camera uniform.
pub(super) struct FixedProgram {
    pub program: glow::NativeProgram,
    pub view: Option<glow::NativeUniformLocation>,
    pub atlas: Option<glow::NativeUniformLocation>,
}

impl FixedProgram {
    pub(super) fn new(
        gl: &glow::Context,
        name: &str,
        vertex: &str,
        fragment: &str,
        attributes: &[&str],
    ) -> RenderResult<Self> {
        let program = link(gl, name, vertex, fragment, attributes)?;
        Ok(Self {
            view: uniform_location(gl, program, "uView"),
            atlas: uniform_location(gl, program, "uAtlas"),
            program,
        })
    }

    /// Binds the program and uploads the camera rect.
    pub(super) fn use_with_view(&self, gl: &glow::Context, view: [f32; 4]) {
        // SAFETY: see `link`.
        unsafe {
            gl.use_program(Some(self.program));
            gl.uniform_4_f32(self.view.as_ref(), view[0], view[1], view[2], view[3]);
            if let Some(atlas) = self.atlas.as_ref() {
                gl.uniform_1_i32(Some(atlas), 0);
            }
        }
    }
}

struct UniformSlot {
    offset: usize,
    ty: ShaderType,
    location: Option<glow::NativeUniformLocation>,
}

/// A full-screen program compiled from the IR.
pub(super) struct EffectProgram {
    pub program: glow::NativeProgram,
    pub blend: BlendMode,
    uniforms: Vec<UniformSlot>,
    channels: [Option<glow::NativeUniformLocation>; MAX_CHANNELS],
}

impl EffectProgram {
    pub(super) fn new(
        gl: &glow::Context,
        program: glow::NativeProgram,
        uniforms: &[UniformDesc],
        blend: BlendMode,
    ) -> Self {
        let uniforms = uniforms
            .iter()
            .map(|u| UniformSlot {
                offset: u.offset,
                ty: u.ty,
                location: uniform_location(gl, program, &uniform_member_name(&u.name)),
            })
            .collect();
        let channels =
            std::array::from_fn(|c| uniform_location(gl, program, &channel_sampler_name(c)));
        Self { program, blend, uniforms, channels }
    }

    /// Uploads the packed block member by member. Members the linker removed are skipped.
    pub(super) fn upload(&self, gl: &glow::Context, packed: &[f32]) {
        for slot in &self.uniforms {
            let Some(loc) = slot.location.as_ref() else { continue };
            let n = slot.ty.components();
            let mut v = [0.0f32; 4];
            for (i, dst) in v.iter_mut().take(n).enumerate() {
                *dst = packed.get(slot.offset + i).copied().unwrap_or(0.0);
            }
            // SAFETY: see `link`; the program is bound by the caller.
            unsafe {
                match slot.ty {
                    ShaderType::Float => gl.uniform_1_f32(Some(loc), v[0]),
                    ShaderType::Vec2 => gl.uniform_2_f32(Some(loc), v[0], v[1]),
                    ShaderType::Vec3 => gl.uniform_3_f32(Some(loc), v[0], v[1], v[2]),
                    ShaderType::Vec4 => gl.uniform_4_f32(Some(loc), v[0], v[1], v[2], v[3]),
                }
            }
        }
    }

    /// Points channel sampler `c` at texture unit `c`.
    pub(super) fn bind_channel_units(&self, gl: &glow::Context) {
        for (unit, loc) in self.channels.iter().enumerate() {
            if let Some(loc) = loc.as_ref() {
                // SAFETY: see `link`.
                unsafe { gl.uniform_1_i32(Some(loc), unit as i32) };
            }
        }
    }
}

/// `glBlendFunc` factors, or `None` to disable blending.
pub(super) fn blend_factors(mode: BlendMode) -> Option<(u32, u32)> {
    match mode {
        BlendMode::Replace => None,
        BlendMode::Alpha => Some((glow::ONE, glow::ONE_MINUS_SRC_ALPHA)),
        BlendMode::Additive => Some((glow::ONE, glow::ONE)),
        BlendMode::Multiply => Some((glow::DST_COLOR, glow::ZERO)),
    }
}

pub(super) fn apply_blend(gl: &glow::Context, mode: BlendMode) {
    // SAFETY: see `link`.
    unsafe {
        match blend_factors(mode) {
            Some((src, dst)) => {
                gl.enable(glow::BLEND);
                gl.blend_func(src, dst);
            }
            None => gl.disable(glow::BLEND),
        }
    }
}
