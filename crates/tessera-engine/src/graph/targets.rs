use crate::coords::SurfaceSize;

/// Number of offscreen slots a backend allocates.
pub const OFFSCREEN_SLOTS: usize = 8;

/// Fixed offscreen slots. The discriminant is the slot index passed to backends and used in
/// [`super::RenderPassStage::inputs`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(usize)]
pub enum OffscreenSlot {
    /// Lit composite plus unlit upper layers; the default input of the post chain.
    Primary = 0,
    /// Layers at or below the shadow cutoff, before lighting.
    Scene = 1,
    /// Accumulated light, at half resolution.
    Lightmap = 2,
    /// Per-light falloff and shadows.
    LightTemp = 3,
    /// Horizontal blur output.
    BlurTemp = 4,
    /// Flat per-sprite mask colors.
    Mask = 5,
    /// Free for user pass stages.
    Post0 = 6,
    Post1 = 7,
}

impl OffscreenSlot {
    pub const ALL: [OffscreenSlot; OFFSCREEN_SLOTS] = [
        OffscreenSlot::Primary,
        OffscreenSlot::Scene,
        OffscreenSlot::Lightmap,
        OffscreenSlot::LightTemp,
        OffscreenSlot::BlurTemp,
        OffscreenSlot::Mask,
        OffscreenSlot::Post0,
        OffscreenSlot::Post1,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Size relative to the surface.
    #[inline]
    pub const fn scale(self) -> f32 {
        match self {
            OffscreenSlot::Lightmap | OffscreenSlot::LightTemp | OffscreenSlot::BlurTemp => 0.5,
            _ => 1.0,
        }
    }
}

/// Pixel size of every slot for a surface of `surface` pixels, in slot order.
pub fn slot_sizes(surface: SurfaceSize) -> [SurfaceSize; OFFSCREEN_SLOTS] {
    OffscreenSlot::ALL.map(|slot| surface.scaled(slot.scale()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lighting_slots_are_half_resolution() {
        let sizes = slot_sizes(SurfaceSize::new(640, 480));
        assert_eq!(sizes[OffscreenSlot::Primary.index()], SurfaceSize::new(640, 480));
        assert_eq!(sizes[OffscreenSlot::Lightmap.index()], SurfaceSize::new(320, 240));
        assert_eq!(sizes[OffscreenSlot::BlurTemp.index()], SurfaceSize::new(320, 240));
        assert_eq!(sizes[OffscreenSlot::Mask.index()], SurfaceSize::new(640, 480));
    }

    #[test]
    fn indices_match_array_positions() {
        for (i, slot) in OffscreenSlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
        }
    }
}
