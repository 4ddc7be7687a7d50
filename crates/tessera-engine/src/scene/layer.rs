use crate::coords::{ColorRgba, Vec2};

use super::ZIndex;

/// Stable caller-chosen identity of a layer across frames.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u32);

/// Upload policy for a layer's instance data.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LayerKind {
    /// Uploaded once when the renderer first sees the layer. Later edits are ignored
    /// until [`crate::Renderer::invalidate_layer`] is called.
    Static,
    /// Re-uploaded whenever the layer has been edited since the last upload.
    Dynamic,
}

/// One textured quad.
///
/// `uv_min`/`uv_max` select the atlas sub-rectangle in normalized coordinates. `mask` is the
/// flat color written to the mask target wherever the sprite's texel alpha is non-zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub texture: String,
    pub position: Vec2,
    pub size: Vec2,
    pub uv_min: Vec2,
    pub uv_max: Vec2,
    pub tint: ColorRgba,
    pub mask: ColorRgba,
}

impl Sprite {
    /// Full-texture sprite with a white tint and no mask contribution.
    pub fn new(texture: impl Into<String>, position: Vec2, size: Vec2) -> Self {
        Self {
            texture: texture.into(),
            position,
            size,
            uv_min: Vec2::ZERO,
            uv_max: Vec2::new(1.0, 1.0),
            tint: ColorRgba::WHITE,
            mask: ColorRgba::TRANSPARENT,
        }
    }

    pub fn with_uv(mut self, uv_min: Vec2, uv_max: Vec2) -> Self {
        self.uv_min = uv_min;
        self.uv_max = uv_max;
        self
    }

    pub fn with_tint(mut self, tint: ColorRgba) -> Self {
        self.tint = tint;
        self
    }

    pub fn with_mask(mut self, mask: ColorRgba) -> Self {
        self.mask = mask;
        self
    }
}

/// An ordered run of sprites sharing a z-index and upload policy.
///
/// Sprites should be grouped by texture; each change of texture along the list costs one draw
/// call.
#[derive(Debug, Clone)]
pub struct SceneLayer {
    pub id: LayerId,
    pub z: ZIndex,
    pub kind: LayerKind,
    sprites: Vec<Sprite>,
    revision: u64,
}

impl SceneLayer {
    pub fn new(id: LayerId, z: ZIndex, kind: LayerKind) -> Self {
        Self {
            id,
            z,
            kind,
            sprites: Vec::new(),
            revision: 0,
        }
    }

    #[inline]
    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    /// Mutable access to the sprite list; marks the layer dirty.
    #[inline]
    pub fn sprites_mut(&mut self) -> &mut Vec<Sprite> {
        self.mark_dirty();
        &mut self.sprites
    }

    #[inline]
    pub fn push(&mut self, sprite: Sprite) {
        self.sprites_mut().push(sprite);
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Bumped by every edit. The renderer compares it against the revision it last uploaded.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_bump_revision() {
        let mut layer = SceneLayer::new(LayerId(1), ZIndex(0), LayerKind::Dynamic);
        let r0 = layer.revision();
        layer.push(Sprite::new("atlas", Vec2::ZERO, Vec2::new(16.0, 16.0)));
        assert_ne!(layer.revision(), r0);

        let r1 = layer.revision();
        let _ = layer.sprites();
        assert_eq!(layer.revision(), r1);
    }

    #[test]
    fn sprite_defaults_cover_full_texture() {
        let s = Sprite::new("atlas", Vec2::ZERO, Vec2::new(8.0, 8.0));
        assert_eq!((s.uv_min, s.uv_max), (Vec2::ZERO, Vec2::new(1.0, 1.0)));
        assert_eq!(s.mask, ColorRgba::TRANSPARENT);
    }
}
