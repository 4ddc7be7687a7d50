/// Stacking key of a layer; larger values draw later.
///
/// Layers with `z <= shadow_cutoff` go through lighting, the rest are drawn unlit on top of
/// the composite (see [`crate::RendererConfig::shadow_cutoff`]).
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ZIndex(pub i32);

impl ZIndex {
    #[inline]
    pub fn is_lit_below(self, cutoff: ZIndex) -> bool {
        self <= cutoff
    }
}
