use crate::backend::{Backend, BufferId, DrawCall, SpriteInstance};
use crate::error::RenderResult;
use crate::scene::{LayerId, LayerKind, SceneLayer, ZIndex};

use super::compute_draw_calls;

/// Backend-side mirror of one scene layer.
///
/// Owns a fixed-capacity instance buffer sized for the layer's kind. The buffer is freed by
/// [`super::LayerTable`] when `lifetime` reaches zero, never by the layer itself.
#[derive(Debug)]
pub struct RendererLayer {
    pub id: LayerId,
    pub z: ZIndex,
    pub kind: LayerKind,
    pub buffer: BufferId,
    pub capacity: usize,
    pub draw_calls: Vec<DrawCall>,
    /// Frames left before eviction if the scene stops referencing the layer.
    pub lifetime: u32,
    pub needs_update: bool,
    uploaded_revision: Option<u64>,
    warned_truncation: bool,
}

impl RendererLayer {
    pub fn new(source: &SceneLayer, buffer: BufferId, capacity: usize, lifetime: u32) -> Self {
        Self {
            id: source.id,
            z: source.z,
            kind: source.kind,
            buffer,
            capacity,
            draw_calls: Vec::new(),
            lifetime,
            needs_update: true,
            uploaded_revision: None,
            warned_truncation: false,
        }
    }

    /// Whether `source` must be re-uploaded this frame.
    ///
    /// Static layers upload once (or after an explicit invalidation). Dynamic layers also
    /// upload whenever their revision moved since the last upload.
    pub fn is_stale(&self, source: &SceneLayer) -> bool {
        self.needs_update
            || (self.kind == LayerKind::Dynamic
                && self.uploaded_revision != Some(source.revision()))
    }

    /// Writes `source`'s sprites into the instance buffer and recomputes draw calls.
    ///
    /// Sprites past capacity are dropped; the first truncation per layer is logged.
    pub fn upload(&mut self, source: &SceneLayer, backend: &mut dyn Backend) -> RenderResult<()> {
        let sprites = source.sprites();
        let kept = if sprites.len() > self.capacity {
            if !self.warned_truncation {
                log::warn!(
                    "layer {:?} holds {} sprites; only the first {} are drawn",
                    self.id,
                    sprites.len(),
                    self.capacity
                );
                self.warned_truncation = true;
            }
            &sprites[..self.capacity]
        } else {
            sprites
        };

        let instances: Vec<SpriteInstance> = kept.iter().map(SpriteInstance::from_sprite).collect();
        backend.write_instances(self.buffer, &instances)?;

        self.draw_calls = compute_draw_calls(kept);
        self.z = source.z;
        self.uploaded_revision = Some(source.revision());
        self.needs_update = false;
        log::trace!(
            "uploaded layer {:?}: {} instances, {} draw calls",
            self.id,
            instances.len(),
            self.draw_calls.len()
        );
        Ok(())
    }
}
