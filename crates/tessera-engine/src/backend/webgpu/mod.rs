//! wgpu adapter: WGSL programs, one render pass per backend call.
//!
//! Every call between `begin_frame` and `end_frame` encodes into the frame's single command
//! encoder, so passes execute in call order on submit. Per-call data (light instances, shadow
//! vertices, program uniforms) is bump-allocated from per-frame arenas.

mod arena;
mod layout;
mod pipelines;
mod resources;

use std::collections::HashMap;
use std::num::NonZeroU64;

use wgpu::util::DeviceExt;

use crate::coords::{ColorRgba, SurfaceSize};
use crate::device::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
use crate::error::{RenderError, RenderResult};
use crate::shader::{ProgramSource, ShaderDialect, MAX_CHANNELS};

use super::{
    missing_target, Backend, BackendKind, BlendMode, BufferId, DrawCall, LightInstance, ProgramDesc,
    SpriteInstance, SpriteMode, Target, TextureData,
};

use arena::FrameArena;
use layout::WgslLayout;
use pipelines::{Layouts, PipelineSpec, VertexInput, QUAD_INDICES, QUAD_VERTICES};
use resources::{Atlas, Offscreen};

struct InstanceBuffer {
    buffer: wgpu::Buffer,
    capacity: usize,
}

struct Program {
    pipeline: wgpu::RenderPipeline,
    layout: WgslLayout,
}

pub struct WgpuBackend<'w> {
    gpu: Gpu<'w>,
    frame: Option<GpuFrame>,
    format: wgpu::TextureFormat,

    layouts: Layouts,
    sprite_color: wgpu::RenderPipeline,
    sprite_mask: wgpu::RenderPipeline,
    light: wgpu::RenderPipeline,
    shadow: wgpu::RenderPipeline,

    quad_vbo: wgpu::Buffer,
    quad_ibo: wgpu::Buffer,
    camera_ubo: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    atlas_sampler: wgpu::Sampler,
    channel_sampler: wgpu::Sampler,
    empty_channel: wgpu::TextureView,

    atlases: HashMap<String, Atlas>,
    targets: Vec<Offscreen>,
    buffers: HashMap<BufferId, InstanceBuffer>,
    next_buffer: u32,
    programs: HashMap<String, Program>,

    uniform_arena: FrameArena,
    light_arena: FrameArena,
    shadow_arena: FrameArena,
    scratch: Vec<f32>,
}

/// Opens a render pass on `target` inside the frame's encoder.
fn begin_pass<'a>(
    frame: &'a mut GpuFrame,
    targets: &'a [Offscreen],
    target: Target,
    load: wgpu::LoadOp<wgpu::Color>,
    label: &str,
) -> RenderResult<wgpu::RenderPass<'a>> {
    let GpuFrame { view: surface_view, encoder, .. } = frame;
    let view = match target {
        Target::Surface => &*surface_view,
        Target::Offscreen(i) => &targets.get(i).ok_or_else(|| missing_target(targets.len(), i))?.view,
    };

    Ok(encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    }))
}

fn wgsl_source<'a>(name: &str, source: &'a ProgramSource) -> RenderResult<&'a str> {
    match source {
        ProgramSource::Wgsl(src) => Ok(src),
        ProgramSource::Glsl { .. } => Err(RenderError::ShaderCompile {
            name: name.to_string(),
            log: "wgpu programs must be WGSL".to_string(),
        }),
    }
}

fn fixed_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    name: &str,
    source: ProgramSource,
    input: VertexInput,
    groups: &[&wgpu::BindGroupLayout],
    blend: BlendMode,
) -> RenderResult<wgpu::RenderPipeline> {
    let source = wgsl_source(name, &source)?;
    pipelines::render_pipeline(device, PipelineSpec { name, source, groups, input, blend, format })
}

fn to_wgpu_color(c: ColorRgba) -> wgpu::Color {
    wgpu::Color { r: c.r as f64, g: c.g as f64, b: c.b as f64, a: c.a as f64 }
}

impl<'w> WgpuBackend<'w> {
    /// Creates the device on `window` and builds the fixed pipelines.
    pub async fn new(
        window: &'w winit::window::Window,
        size: SurfaceSize,
        init: GpuInit,
    ) -> RenderResult<Self> {
        let gpu = Gpu::new(window, size, init).await.map_err(|e| {
            RenderError::UnsupportedBackend { kind: BackendKind::Wgpu, reason: format!("{e:#}") }
        })?;
        Self::with_gpu(gpu)
    }

    pub fn with_gpu(gpu: Gpu<'w>) -> RenderResult<Self> {
        let format = gpu.surface_format();
        let device = gpu.device();
        let dialect = ShaderDialect::Wgsl;
        let layouts = Layouts::new(device);

        let sprite_groups = [&layouts.camera, &layouts.atlas];
        let camera_group = [&layouts.camera];
        let sprite_color = fixed_pipeline(
            device,
            format,
            "tessera sprite",
            dialect.sprite_program(SpriteMode::Color),
            VertexInput::Sprite,
            &sprite_groups,
            BlendMode::Alpha,
        )?;
        let sprite_mask = fixed_pipeline(
            device,
            format,
            "tessera sprite mask",
            dialect.sprite_program(SpriteMode::Mask),
            VertexInput::Sprite,
            &sprite_groups,
            BlendMode::Alpha,
        )?;
        let light = fixed_pipeline(
            device,
            format,
            "tessera light",
            dialect.light_program(),
            VertexInput::Light,
            &camera_group,
            BlendMode::Replace,
        )?;
        let shadow = fixed_pipeline(
            device,
            format,
            "tessera shadow",
            dialect.shadow_program(),
            VertexInput::Shadow,
            &camera_group,
            BlendMode::Replace,
        )?;

        let quad_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tessera quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tessera quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        let camera_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessera camera ubo"),
            size: size_of::<[f32; 4]>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessera camera bind group"),
            layout: &layouts.camera,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: camera_ubo.as_entire_binding() }],
        });

        let align = gpu.uniform_alignment();
        let uniform_arena = FrameArena::new(
            device,
            "tessera uniform arena",
            wgpu::BufferUsages::UNIFORM,
            align * 64,
            align,
        );
        let light_arena = FrameArena::new(
            device,
            "tessera light arena",
            wgpu::BufferUsages::VERTEX,
            size_of::<LightInstance>() as u64 * 64,
            size_of::<LightInstance>() as u64,
        );
        let shadow_arena = FrameArena::new(
            device,
            "tessera shadow arena",
            wgpu::BufferUsages::VERTEX,
            64 * 1024,
            wgpu::COPY_BUFFER_ALIGNMENT,
        );

        Ok(Self {
            atlas_sampler: resources::sampler(device, "tessera atlas sampler", wgpu::FilterMode::Nearest),
            channel_sampler: resources::sampler(device, "tessera channel sampler", wgpu::FilterMode::Linear),
            empty_channel: resources::placeholder(device, gpu.queue(), wgpu::TextureFormat::Rgba8Unorm),
            frame: None,
            format,
            layouts,
            sprite_color,
            sprite_mask,
            light,
            shadow,
            quad_vbo,
            quad_ibo,
            camera_ubo,
            camera_bind_group,
            atlases: HashMap::new(),
            targets: Vec::new(),
            buffers: HashMap::new(),
            next_buffer: 0,
            programs: HashMap::new(),
            uniform_arena,
            light_arena,
            shadow_arena,
            scratch: Vec::new(),
            gpu,
        })
    }

    fn acquire(&mut self) -> RenderResult<Option<GpuFrame>> {
        for _ in 0..2 {
            match self.gpu.begin_frame() {
                Ok(frame) => return Ok(Some(frame)),
                Err(err) => match self.gpu.handle_surface_error(&err) {
                    SurfaceErrorAction::Reconfigured => continue,
                    SurfaceErrorAction::SkipFrame => {
                        log::debug!("skipping frame: {err}");
                        return Ok(None);
                    }
                    SurfaceErrorAction::Fatal => return Err(err.into()),
                },
            }
        }
        Ok(None)
    }

    fn channel_bind_group(&self, inputs: &[usize], output: Target) -> RenderResult<wgpu::BindGroup> {
        let mut views = Vec::with_capacity(MAX_CHANNELS);
        for c in 0..MAX_CHANNELS {
            let view = match inputs.get(c) {
                Some(&slot) if Target::Offscreen(slot) == output => {
                    log::warn!("offscreen {slot} is both input and output; channel {c} reads empty");
                    &self.empty_channel
                }
                Some(&slot) => {
                    &self.targets.get(slot).ok_or_else(|| missing_target(self.targets.len(), slot))?.view
                }
                None => &self.empty_channel,
            };
            views.push(view);
        }

        let mut entries: Vec<wgpu::BindGroupEntry<'_>> = views
            .iter()
            .enumerate()
            .map(|(i, &view)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: MAX_CHANNELS as u32,
            resource: wgpu::BindingResource::Sampler(&self.channel_sampler),
        });

        Ok(self.gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessera channels"),
            layout: &self.layouts.channels,
            entries: &entries,
        }))
    }
}

impl Backend for WgpuBackend<'_> {
    fn kind(&self) -> BackendKind {
        BackendKind::Wgpu
    }

    fn load_texture(&mut self, texture: &TextureData) -> RenderResult<()> {
        texture.validate()?;
        let atlas = Atlas::upload(
            self.gpu.device(),
            self.gpu.queue(),
            texture,
            resources::atlas_format(self.format),
            &self.layouts.atlas,
            &self.atlas_sampler,
        );
        self.atlases.insert(texture.name.clone(), atlas);
        Ok(())
    }

    fn compile_program(&mut self, name: &str, desc: &ProgramDesc) -> RenderResult<()> {
        let source = wgsl_source(name, &desc.source)?;
        let pipeline = pipelines::render_pipeline(self.gpu.device(), PipelineSpec {
            name,
            source,
            groups: &[&self.layouts.uniforms, &self.layouts.channels],
            input: VertexInput::FullScreen,
            blend: desc.blend,
            format: self.format,
        })?;
        self.programs.insert(name.to_string(), Program {
            pipeline,
            layout: WgslLayout::new(&desc.uniforms),
        });
        Ok(())
    }

    fn configure_targets(&mut self, surface: SurfaceSize, targets: &[SurfaceSize])
    -> RenderResult<()> {
        self.gpu.resize(surface);
        let device = self.gpu.device();
        self.targets = targets
            .iter()
            .enumerate()
            .map(|(i, &size)| Offscreen::new(device, i, size, self.format))
            .collect();
        log::debug!(
            "configured {} offscreen targets for {}x{} (first {:?})",
            self.targets.len(),
            surface.width,
            surface.height,
            self.targets.first().map(|t| t.size),
        );
        Ok(())
    }

    fn create_instance_buffer(&mut self, capacity: usize) -> RenderResult<BufferId> {
        let id = BufferId(self.next_buffer);
        self.next_buffer = self.next_buffer.wrapping_add(1);
        let buffer = self.gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessera instance buffer"),
            size: (capacity.max(1) * size_of::<SpriteInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
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
        if n > 0 {
            self.gpu
                .queue()
                .write_buffer(&target.buffer, 0, bytemuck::cast_slice(&instances[..n]));
        }
        Ok(())
    }

    fn free_instance_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_none() {
            log::warn!("free of unknown instance buffer {buffer:?}");
        }
    }

    fn begin_frame(&mut self, view: [f32; 4]) -> RenderResult<()> {
        // A frame aborted by an error still holds its surface texture.
        self.frame = None;
        self.frame = self.acquire()?;
        self.gpu.queue().write_buffer(&self.camera_ubo, 0, bytemuck::cast_slice(&view));
        self.uniform_arena.reset();
        self.light_arena.reset();
        self.shadow_arena.reset();
        Ok(())
    }

    fn clear(&mut self, target: Target, color: ColorRgba) -> RenderResult<()> {
        let Some(frame) = self.frame.as_mut() else { return Ok(()) };
        let load = wgpu::LoadOp::Clear(to_wgpu_color(color));
        begin_pass(frame, &self.targets, target, load, "tessera clear")?;
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
        let Some(instances) = self.buffers.get(&buffer) else {
            log::warn!("draw from unknown instance buffer {buffer:?}");
            return Ok(());
        };
        let Some(frame) = self.frame.as_mut() else { return Ok(()) };
        if calls.is_empty() {
            return Ok(());
        }

        let mut rpass = begin_pass(frame, &self.targets, target, wgpu::LoadOp::Load, "tessera sprites")?;
        rpass.set_pipeline(match mode {
            SpriteMode::Color => &self.sprite_color,
            SpriteMode::Mask => &self.sprite_mask,
        });
        rpass.set_bind_group(0, &self.camera_bind_group, &[]);
        rpass.set_vertex_buffer(0, self.quad_vbo.slice(..));
        rpass.set_vertex_buffer(1, instances.buffer.slice(..));
        rpass.set_index_buffer(self.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);

        for call in calls {
            let Some(atlas) = self.atlases.get(&call.texture) else { continue };
            rpass.set_bind_group(1, &atlas.bind_group, &[]);
            let start = call.instance_offset;
            rpass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, start..start + call.instance_count);
        }
        Ok(())
    }

    fn draw_light(&mut self, target: Target, light: &LightInstance) -> RenderResult<()> {
        let Some(frame) = self.frame.as_mut() else { return Ok(()) };
        let offset = self.light_arena.push(
            self.gpu.device(),
            self.gpu.queue(),
            bytemuck::bytes_of(light),
        );
        let end = offset + size_of::<LightInstance>() as u64;

        let mut rpass = begin_pass(frame, &self.targets, target, wgpu::LoadOp::Load, "tessera light")?;
        rpass.set_pipeline(&self.light);
        rpass.set_bind_group(0, &self.camera_bind_group, &[]);
        rpass.set_vertex_buffer(0, self.quad_vbo.slice(..));
        rpass.set_vertex_buffer(1, self.light_arena.buffer().slice(offset..end));
        rpass.set_index_buffer(self.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
        Ok(())
    }

    fn draw_shadows(&mut self, target: Target, triangles: &[[f32; 2]]) -> RenderResult<()> {
        let Some(frame) = self.frame.as_mut() else { return Ok(()) };
        if triangles.is_empty() {
            return Ok(());
        }
        let bytes: &[u8] = bytemuck::cast_slice(triangles);
        let offset = self.shadow_arena.push(self.gpu.device(), self.gpu.queue(), bytes);
        let end = offset + bytes.len() as u64;

        let mut rpass = begin_pass(frame, &self.targets, target, wgpu::LoadOp::Load, "tessera shadows")?;
        rpass.set_pipeline(&self.shadow);
        rpass.set_bind_group(0, &self.camera_bind_group, &[]);
        rpass.set_vertex_buffer(0, self.shadow_arena.buffer().slice(offset..end));
        rpass.draw(0..triangles.len() as u32, 0..1);
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
        if self.frame.is_none() {
            return Ok(());
        }

        program.layout.repack_into(uniforms, &mut self.scratch);
        let size = program.layout.byte_len();
        let offset = self.uniform_arena.push(
            self.gpu.device(),
            self.gpu.queue(),
            bytemuck::cast_slice(&self.scratch),
        );
        let uniform_bind_group = self.gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(name),
            layout: &self.layouts.uniforms,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: self.uniform_arena.buffer(),
                    offset,
                    size: NonZeroU64::new(size),
                }),
            }],
        });
        let channels = self.channel_bind_group(inputs, output)?;

        let load = clear.map_or(wgpu::LoadOp::Load, |c| wgpu::LoadOp::Clear(to_wgpu_color(c)));
        let Some(frame) = self.frame.as_mut() else { return Ok(()) };
        let mut rpass = begin_pass(frame, &self.targets, output, load, name)?;
        rpass.set_pipeline(&program.pipeline);
        rpass.set_bind_group(0, &uniform_bind_group, &[]);
        rpass.set_bind_group(1, &channels, &[]);
        rpass.draw(0..3, 0..1);
        Ok(())
    }

    fn end_frame(&mut self) -> RenderResult<()> {
        if let Some(frame) = self.frame.take() {
            self.gpu.submit(frame);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wgsl_source_borrows_the_module_text() {
        let source = ProgramSource::Wgsl("@fragment fn fs_main() {}".to_string());
        assert_eq!(wgsl_source("copy", &source).ok(), Some("@fragment fn fs_main() {}"));
    }

    #[test]
    fn glsl_source_is_rejected_as_a_compile_error() {
        let source = ShaderDialect::GlslEs300.sprite_program(SpriteMode::Color);
        assert!(matches!(
            wgsl_source("sprite", &source),
            Err(RenderError::ShaderCompile { name, .. }) if name == "sprite"
        ));
    }
}
