use crate::batch::{LayerLimits, LAYER_LIFETIME};
use crate::coords::ColorRgba;
use crate::device::GpuInit;
use crate::scene::ZIndex;

/// Renderer tuning knobs. Every field has a working default.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Color the scene slot is cleared to each frame.
    pub clear_color: ColorRgba,

    /// Layers at or below this z receive lighting; higher layers are drawn unlit on top.
    pub shadow_cutoff: ZIndex,

    /// Instance ceiling of a static layer's buffer.
    pub static_capacity: usize,
    /// Instance ceiling of a dynamic layer's buffer.
    pub dynamic_capacity: usize,
    /// Consecutive unreferenced frames before a layer's buffer is freed.
    pub layer_lifetime: u32,

    /// Tap spacing of the lightmap blur, in texels.
    pub blur_radius: f32,
    /// Cell edge of the collider broad phase, in world units.
    pub light_cell_size: f32,

    /// Device and surface preferences; only read by the wgpu backend.
    pub gpu: GpuInit,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: ColorRgba::BLACK,
            shadow_cutoff: ZIndex(0),
            static_capacity: 65_536,
            dynamic_capacity: 16_384,
            layer_lifetime: LAYER_LIFETIME,
            blur_radius: 1.5,
            light_cell_size: 128.0,
            gpu: GpuInit::default(),
        }
    }
}

impl RendererConfig {
    pub(crate) fn layer_limits(&self) -> LayerLimits {
        LayerLimits {
            static_capacity: self.static_capacity,
            dynamic_capacity: self.dynamic_capacity,
            lifetime: self.layer_lifetime.max(1),
        }
    }
}
