//! Backend contract and shared GPU-facing types.
//!
//! The frame graph talks to the GPU exclusively through [`Backend`]. Every call is
//! pass-granular: the renderer decides *what* to draw and in which order; an adapter only
//! knows how to express one clear, one sprite batch or one full-screen program natively.
//!
//! Adapters:
//! - [`gl::GlBackend`] for GLSL ES 1.00 and 3.00 through `glow`
//! - [`webgpu::WgpuBackend`] for WGSL through `wgpu`

pub mod gl;
pub mod webgpu;

#[cfg(test)]
pub mod recording;

use bytemuck::{Pod, Zeroable};

use crate::coords::{ColorRgba, SurfaceSize};
use crate::device::GpuInit;
use crate::error::{RenderError, RenderResult};
use crate::scene::{Light, Sprite};
use crate::shader::{ProgramSource, ShaderDialect, UniformDesc};

/// Rendering API selected at startup.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BackendKind {
    /// OpenGL ES 2 class devices (GLSL ES 1.00, instancing via extension).
    Gles2,
    /// OpenGL ES 3 / desktop GL 3.3 (GLSL ES 3.00).
    Gles3,
    /// wgpu (WGSL).
    Wgpu,
}

impl BackendKind {
    #[inline]
    pub const fn dialect(self) -> ShaderDialect {
        match self {
            BackendKind::Gles2 => ShaderDialect::GlslEs100,
            BackendKind::Gles3 => ShaderDialect::GlslEs300,
            BackendKind::Wgpu => ShaderDialect::Wgsl,
        }
    }
}

/// Color blending for a registered program. Colors are treated as premultiplied.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Replace,
    Alpha,
    Additive,
    Multiply,
}

/// Which fragment output the sprite program produces.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SpriteMode {
    /// Texel multiplied by the sprite tint.
    Color,
    /// Flat mask color wherever the texel is non-transparent.
    Mask,
}

/// Render destination of a backend call.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Target {
    /// Index into the offscreen slot array configured by [`Backend::configure_targets`].
    Offscreen(usize),
    /// The presentable surface.
    Surface,
}

/// Handle to an instance buffer owned by a backend.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// Per-sprite instance data, shared verbatim by every adapter's vertex layout.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SpriteInstance {
    pub position: [f32; 2],
    pub size: [f32; 2],
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
    pub tint: [f32; 4],
    pub mask: [f32; 4],
}

impl SpriteInstance {
    pub fn from_sprite(s: &Sprite) -> Self {
        Self {
            position: s.position.to_array(),
            size: s.size.to_array(),
            uv_min: s.uv_min.to_array(),
            uv_max: s.uv_max.to_array(),
            tint: s.tint.to_array(),
            mask: s.mask.to_array(),
        }
    }
}

/// Per-light instance data for the light program.
///
/// `cos_cutoff` is `-1` for omni lights so the cone test always passes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LightInstance {
    pub center: [f32; 2],
    pub radius: f32,
    pub cos_cutoff: f32,
    pub direction: [f32; 2],
    pub _pad: [f32; 2],
    pub color: [f32; 4],
}

impl LightInstance {
    pub fn from_light(l: &Light) -> Self {
        let color = l.color.scaled_rgb(l.intensity);
        Self {
            center: l.position.to_array(),
            radius: l.radius,
            cos_cutoff: l.spot_cutoff.map_or(-1.0, f32::cos),
            direction: crate::coords::Vec2::from_angle(l.direction).to_array(),
            _pad: [0.0; 2],
            color: color.to_array(),
        }
    }
}

/// One maximal run of same-texture instances inside an instance buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub texture: String,
    pub instance_offset: u32,
    pub instance_count: u32,
}

/// Named RGBA8 atlas supplied to [`crate::Renderer::init`].
#[derive(Debug, Clone)]
pub struct TextureData {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureData {
    pub fn new(name: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self { name: name.into(), width, height, pixels }
    }

    /// Checks that the pixel buffer holds exactly `width * height` RGBA8 texels.
    pub fn validate(&self) -> RenderResult<()> {
        let expected = self.width as usize * self.height as usize * 4;
        if self.width == 0 || self.height == 0 || self.pixels.len() != expected {
            return Err(RenderError::InvalidTexture {
                name: self.name.clone(),
                width: self.width,
                height: self.height,
                expected,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }
}

/// A full-screen program ready for native compilation.
#[derive(Debug, Clone)]
pub struct ProgramDesc {
    pub source: ProgramSource,
    /// Uniform table in packed order; `uniform_len` floats follow the last entry.
    pub uniforms: Vec<UniformDesc>,
    pub uniform_len: usize,
    pub blend: BlendMode,
}

/// Abstract rendering calls issued by the frame graph.
///
/// Calls between `begin_frame` and `end_frame` are recorded in order and observed in order.
/// Offscreen slots keep their contents across calls within a frame.
pub trait Backend {
    fn kind(&self) -> BackendKind;

    #[inline]
    fn dialect(&self) -> ShaderDialect {
        self.kind().dialect()
    }

    /// Uploads a named atlas. Re-loading a name replaces the previous texture.
    fn load_texture(&mut self, texture: &TextureData) -> RenderResult<()>;

    /// Compiles and links a full-screen program under `name`.
    fn compile_program(&mut self, name: &str, desc: &ProgramDesc) -> RenderResult<()>;

    /// (Re)creates every offscreen slot; `targets[i]` is the pixel size of slot `i`.
    fn configure_targets(&mut self, surface: SurfaceSize, targets: &[SurfaceSize])
    -> RenderResult<()>;

    fn create_instance_buffer(&mut self, capacity: usize) -> RenderResult<BufferId>;

    /// Overwrites the start of the buffer. `instances.len()` never exceeds its capacity.
    fn write_instances(&mut self, buffer: BufferId, instances: &[SpriteInstance])
    -> RenderResult<()>;

    fn free_instance_buffer(&mut self, buffer: BufferId);

    /// Starts a frame. `view` is `(origin.x, origin.y, width, height)` in world units.
    fn begin_frame(&mut self, view: [f32; 4]) -> RenderResult<()>;

    fn clear(&mut self, target: Target, color: ColorRgba) -> RenderResult<()>;

    /// Draws instance runs from `buffer`; every call's texture must have been loaded.
    fn draw_sprites(
        &mut self,
        target: Target,
        mode: SpriteMode,
        buffer: BufferId,
        calls: &[DrawCall],
    ) -> RenderResult<()>;

    /// Draws one light's falloff quad, replacing the target's contents under it.
    fn draw_light(&mut self, target: Target, light: &LightInstance) -> RenderResult<()>;

    /// Draws shadow-caster triangles (a flat list of vertices) in transparent black.
    fn draw_shadows(&mut self, target: Target, triangles: &[[f32; 2]]) -> RenderResult<()>;

    /// Runs a compiled full-screen program. `inputs[c]` is the offscreen slot bound to
    /// channel `c`; `uniforms` is the packed block of the program's `uniform_len` floats.
    fn run_program(
        &mut self,
        name: &str,
        inputs: &[usize],
        output: Target,
        uniforms: &[f32],
        clear: Option<ColorRgba>,
    ) -> RenderResult<()>;

    /// Submits the frame and presents the surface.
    fn end_frame(&mut self) -> RenderResult<()>;
}

/// Native context handed to [`connect`].
pub enum HostContext<'w> {
    /// A current GL / GLES context; the host swaps buffers after `render`.
    Gl(glow::Context),
    /// A window the wgpu adapter creates its surface on.
    Window(&'w winit::window::Window),
}

impl HostContext<'_> {
    fn describe(&self) -> &'static str {
        match self {
            HostContext::Gl(_) => "a GL context",
            HostContext::Window(_) => "a window",
        }
    }
}

/// Error for an offscreen lookup that failed: before `configure_targets` no slot exists yet.
pub(crate) fn missing_target(configured: usize, slot: usize) -> RenderError {
    if configured == 0 { RenderError::NotInitialized } else { RenderError::UnknownTarget(slot) }
}

/// Creates the adapter for `kind` on `host`.
///
/// Fails with [`RenderError::UnsupportedBackend`] when the host cannot run `kind` (wrong
/// host type, GL version too old, missing instancing support, no wgpu adapter).
pub async fn connect<'w>(
    kind: BackendKind,
    host: HostContext<'w>,
    size: SurfaceSize,
    gpu: GpuInit,
) -> RenderResult<Box<dyn Backend + 'w>> {
    match (kind, host) {
        (BackendKind::Gles2 | BackendKind::Gles3, HostContext::Gl(context)) => {
            let backend = gl::GlBackend::new(kind, context, size)?;
            log::info!("connected {kind:?} backend");
            Ok(Box::new(backend))
        }
        (BackendKind::Wgpu, HostContext::Window(window)) => {
            let backend = webgpu::WgpuBackend::new(window, size, gpu).await?;
            log::info!("connected {kind:?} backend");
            Ok(Box::new(backend))
        }
        (kind, host) => Err(RenderError::UnsupportedBackend {
            kind,
            reason: format!("cannot run on {}", host.describe()),
        }),
    }
}
