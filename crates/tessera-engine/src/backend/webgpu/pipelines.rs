//! Bind group layouts, vertex layouts and pipeline construction for the wgpu adapter.

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};

use crate::backend::{BlendMode, LightInstance, SpriteInstance};
use crate::error::{RenderError, RenderResult};
use crate::shader::MAX_CHANNELS;

// ── blend ─────────────────────────────────────────────────────────────────

pub(super) fn blend_state(mode: BlendMode) -> Option<wgpu::BlendState> {
    let component = |src, dst| wgpu::BlendComponent {
        src_factor: src,
        dst_factor: dst,
        operation: wgpu::BlendOperation::Add,
    };
    match mode {
        BlendMode::Replace => Some(wgpu::BlendState::REPLACE),
        BlendMode::Alpha => Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
        BlendMode::Additive => {
            let add = component(wgpu::BlendFactor::One, wgpu::BlendFactor::One);
            Some(wgpu::BlendState { color: add, alpha: add })
        }
        BlendMode::Multiply => {
            let mul = component(wgpu::BlendFactor::Dst, wgpu::BlendFactor::Zero);
            Some(wgpu::BlendState { color: mul, alpha: mul })
        }
    }
}

// ── vertex layouts ────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct QuadVertex {
    pub corner: [f32; 2],
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

pub(super) const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { corner: [0.0, 0.0] },
    QuadVertex { corner: [1.0, 0.0] },
    QuadVertex { corner: [1.0, 1.0] },
    QuadVertex { corner: [0.0, 1.0] },
];

pub(super) const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

const SPRITE_ATTRS: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
    1 => Float32x2,
    2 => Float32x2,
    3 => Float32x2,
    4 => Float32x2,
    5 => Float32x4,
    6 => Float32x4,
];

fn sprite_instance_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: size_of::<SpriteInstance>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &SPRITE_ATTRS,
    }
}

// `LightInstance` carries padding between `direction` and `color`.
const LIGHT_ATTRS: [wgpu::VertexAttribute; 4] = [
    wgpu::VertexAttribute { format: wgpu::VertexFormat::Float32x2, offset: 0, shader_location: 1 },
    wgpu::VertexAttribute { format: wgpu::VertexFormat::Float32x2, offset: 8, shader_location: 2 },
    wgpu::VertexAttribute { format: wgpu::VertexFormat::Float32x2, offset: 16, shader_location: 3 },
    wgpu::VertexAttribute { format: wgpu::VertexFormat::Float32x4, offset: 32, shader_location: 4 },
];

fn light_instance_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: size_of::<LightInstance>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &LIGHT_ATTRS,
    }
}

const SHADOW_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

fn shadow_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: size_of::<[f32; 2]>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &SHADOW_ATTRS,
    }
}

// ── shader modules ────────────────────────────────────────────────────────

/// Parses and validates WGSL with naga so a bad program surfaces as an error instead of a
/// device-level panic.
pub(super) fn validate_wgsl(name: &str, source: &str) -> RenderResult<()> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| RenderError::ShaderCompile {
        name: name.to_string(),
        log: e.emit_to_string(source),
    })?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| RenderError::ShaderCompile {
        name: name.to_string(),
        log: e.emit_to_string(source),
    })?;
    Ok(())
}

pub(super) fn shader_module(
    device: &wgpu::Device,
    name: &str,
    source: &str,
) -> RenderResult<wgpu::ShaderModule> {
    validate_wgsl(name, source)?;
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(name),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    }))
}

// ── bind group layouts ────────────────────────────────────────────────────

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages, min: Option<NonZeroU64>)
-> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: min,
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Layouts shared by every pipeline of one adapter.
pub(super) struct Layouts {
    /// Group 0 of fixed programs: the 16-byte camera rect.
    pub camera: wgpu::BindGroupLayout,
    /// Group 1 of sprite programs: atlas texture + sampler.
    pub atlas: wgpu::BindGroupLayout,
    /// Group 0 of full-screen programs: the repacked uniform block.
    pub uniforms: wgpu::BindGroupLayout,
    /// Group 1 of full-screen programs: `MAX_CHANNELS` inputs + shared sampler.
    pub channels: wgpu::BindGroupLayout,
}

impl Layouts {
    pub(super) fn new(device: &wgpu::Device) -> Self {
        let camera = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tessera camera bgl"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX, NonZeroU64::new(16))],
        });
        let atlas = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tessera atlas bgl"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });
        let uniforms = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tessera program uniforms bgl"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::FRAGMENT, None)],
        });

        let mut entries: Vec<_> = (0..MAX_CHANNELS as u32).map(texture_entry).collect();
        entries.push(sampler_entry(MAX_CHANNELS as u32));
        let channels = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tessera channels bgl"),
            entries: &entries,
        });

        Self { camera, atlas, uniforms, channels }
    }
}

// ── pipelines ─────────────────────────────────────────────────────────────

/// Which vertex inputs a pipeline consumes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(super) enum VertexInput {
    Sprite,
    Light,
    Shadow,
    /// Generated from `vertex_index`; no buffers.
    FullScreen,
}

impl VertexInput {
    fn buffers(self) -> Vec<wgpu::VertexBufferLayout<'static>> {
        match self {
            VertexInput::Sprite => vec![QuadVertex::layout(), sprite_instance_layout()],
            VertexInput::Light => vec![QuadVertex::layout(), light_instance_layout()],
            VertexInput::Shadow => vec![shadow_vertex_layout()],
            VertexInput::FullScreen => Vec::new(),
        }
    }
}

pub(super) struct PipelineSpec<'a> {
    pub name: &'a str,
    pub source: &'a str,
    pub groups: &'a [&'a wgpu::BindGroupLayout],
    pub input: VertexInput,
    pub blend: BlendMode,
    pub format: wgpu::TextureFormat,
}

pub(super) fn render_pipeline(
    device: &wgpu::Device,
    spec: PipelineSpec<'_>,
) -> RenderResult<wgpu::RenderPipeline> {
    let shader = shader_module(device, spec.name, spec.source)?;

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(spec.name),
        bind_group_layouts: spec.groups,
        immediate_size: 0,
    });

    let buffers = spec.input.buffers();
    Ok(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(spec.name),
        layout: Some(&layout),

        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: spec.format,
                blend: blend_state(spec.blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SpriteMode;
    use crate::shader::{ProgramSource, ShaderDialect};

    #[test]
    fn light_attributes_match_instance_fields() {
        let offsets: Vec<u64> = LIGHT_ATTRS.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![
            std::mem::offset_of!(LightInstance, center) as u64,
            std::mem::offset_of!(LightInstance, radius) as u64,
            std::mem::offset_of!(LightInstance, direction) as u64,
            std::mem::offset_of!(LightInstance, color) as u64,
        ]);
    }

    #[test]
    fn sprite_attributes_cover_the_instance() {
        let last = SPRITE_ATTRS[5];
        assert_eq!(last.offset, std::mem::offset_of!(SpriteInstance, mask) as u64);
        assert_eq!(last.offset + 16, size_of::<SpriteInstance>() as u64);
    }

    #[test]
    fn blend_modes_map_to_distinct_states() {
        assert_eq!(blend_state(BlendMode::Replace), Some(wgpu::BlendState::REPLACE));
        let add = blend_state(BlendMode::Additive).unwrap();
        assert_eq!(add.color.dst_factor, wgpu::BlendFactor::One);
        let mul = blend_state(BlendMode::Multiply).unwrap();
        assert_eq!(mul.color.src_factor, wgpu::BlendFactor::Dst);
    }

    #[test]
    fn fixed_programs_pass_validation() {
        for (name, src) in [
            ("sprite", ShaderDialect::Wgsl.sprite_program(SpriteMode::Color)),
            ("mask", ShaderDialect::Wgsl.sprite_program(SpriteMode::Mask)),
            ("light", ShaderDialect::Wgsl.light_program()),
            ("shadow", ShaderDialect::Wgsl.shadow_program()),
        ] {
            let ProgramSource::Wgsl(src) = src else { panic!("{name} is not WGSL") };
            validate_wgsl(name, &src).unwrap();
        }
    }

    #[test]
    fn invalid_wgsl_is_reported_as_compile_error() {
        let err = validate_wgsl("broken", "fn fs_main( {").unwrap_err();
        assert!(matches!(err, RenderError::ShaderCompile { ref name, .. } if name == "broken"));
    }
}
