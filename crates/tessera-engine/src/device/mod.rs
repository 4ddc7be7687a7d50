//! wgpu device + surface management for the wgpu backend.
//!
//! Creates the instance, adapter, device and queue, configures the window surface and hands out
//! one [`GpuFrame`] per rendered frame. Surface acquisition failures are classified by
//! [`SurfaceErrorAction`] so the adapter can retry, skip or give up.

mod context;
mod frame;
mod surface;

pub use context::Gpu;
pub use frame::GpuFrame;
pub use surface::SurfaceErrorAction;

/// Device and surface preferences for the wgpu backend. GL backends ignore it.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Native APIs wgpu may pick an adapter from.
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,
    /// Use an sRGB surface (and sRGB atlases) when the surface offers one.
    pub prefer_srgb: bool,
    pub present_mode: wgpu::PresentMode,
    pub frame_latency: u32,
    /// Defaults to the WebGL2 downlevel set, which every adapter the renderer targets meets.
    pub limits: wgpu::Limits,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            frame_latency: 2,
            limits: wgpu::Limits::downlevel_webgl2_defaults(),
        }
    }
}
