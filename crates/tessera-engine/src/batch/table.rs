use std::collections::HashMap;

use crate::backend::Backend;
use crate::error::RenderResult;
use crate::scene::{LayerId, LayerKind, SceneLayer};

use super::RendererLayer;

/// Instance ceilings and eviction delay for renderer layers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LayerLimits {
    pub static_capacity: usize,
    pub dynamic_capacity: usize,
    /// Consecutive unreferenced frames before a layer is evicted.
    pub lifetime: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
struct SlotKey {
    index: u32,
    generation: u32,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    layer: Option<RendererLayer>,
    touched: bool,
}

/// Generational slot table of renderer layers keyed by [`LayerId`].
///
/// Freed slots are reused; the generation bump makes stale keys resolve to nothing.
#[derive(Debug)]
pub struct LayerTable {
    limits: LayerLimits,
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_id: HashMap<LayerId, SlotKey>,
}

impl LayerTable {
    pub fn new(limits: LayerLimits) -> Self {
        Self {
            limits,
            slots: Vec::new(),
            free: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, id: LayerId) -> Option<&RendererLayer> {
        let key = self.by_id.get(&id)?;
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.layer.as_ref()
    }

    fn get_mut(&mut self, id: LayerId) -> Option<&mut Slot> {
        let key = *self.by_id.get(&id)?;
        let slot = self.slots.get_mut(key.index as usize)?;
        (slot.generation == key.generation && slot.layer.is_some()).then_some(slot)
    }

    /// Forces the next sync to re-upload `id`. Unknown ids are ignored.
    pub fn invalidate(&mut self, id: LayerId) {
        if let Some(layer) = self.get_mut(id).and_then(|s| s.layer.as_mut()) {
            layer.needs_update = true;
        }
    }

    /// Mirrors `layers` into the table: creates missing layers, uploads stale ones and
    /// refreshes the lifetime of every referenced layer.
    ///
    /// A layer whose [`LayerKind`] changed under the same id is dropped and recreated with the
    /// new kind's capacity and upload policy.
    pub fn sync(&mut self, layers: &[SceneLayer], backend: &mut dyn Backend) -> RenderResult<()> {
        for source in layers {
            if self.get(source.id).is_some_and(|l| l.kind != source.kind) {
                log::debug!("layer {:?} changed kind to {:?}", source.id, source.kind);
                self.remove(source.id, backend);
            }
            if self.get(source.id).is_none() {
                self.create(source, backend)?;
            }

            let lifetime = self.limits.lifetime;
            let Some(slot) = self.get_mut(source.id) else { continue };
            slot.touched = true;
            let Some(layer) = slot.layer.as_mut() else { continue };
            layer.lifetime = lifetime;
            layer.z = source.z;
            if layer.is_stale(source) {
                layer.upload(source, backend)?;
            }
        }
        Ok(())
    }

    fn create(&mut self, source: &SceneLayer, backend: &mut dyn Backend) -> RenderResult<()> {
        let capacity = match source.kind {
            LayerKind::Static => self.limits.static_capacity,
            LayerKind::Dynamic => self.limits.dynamic_capacity,
        };
        let buffer = backend.create_instance_buffer(capacity)?;
        let layer = RendererLayer::new(source, buffer, capacity, self.limits.lifetime);

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.layer = Some(layer);
        slot.touched = false;
        self.by_id.insert(source.id, SlotKey { index, generation: slot.generation });

        log::debug!("created {:?} layer {:?} (capacity {capacity})", source.kind, source.id);
        Ok(())
    }

    /// Ages every layer not referenced since the previous call and evicts those whose
    /// lifetime reached zero. Each evicted buffer is freed exactly once.
    pub fn collect_garbage(&mut self, backend: &mut dyn Backend) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let touched = std::mem::take(&mut slot.touched);
            let Some(layer) = slot.layer.as_mut() else { continue };
            if touched {
                continue;
            }

            layer.lifetime = layer.lifetime.saturating_sub(1);
            if layer.lifetime > 0 {
                continue;
            }

            if let Some(layer) = slot.layer.take() {
                backend.free_instance_buffer(layer.buffer);
                self.by_id.remove(&layer.id);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                log::debug!("evicted layer {:?}", layer.id);
            }
        }
    }

    fn remove(&mut self, id: LayerId, backend: &mut dyn Backend) {
        let Some(key) = self.by_id.remove(&id) else { return };
        let Some(slot) = self.slots.get_mut(key.index as usize) else { return };
        if slot.generation != key.generation {
            return;
        }
        if let Some(layer) = slot.layer.take() {
            backend.free_instance_buffer(layer.buffer);
            slot.generation = slot.generation.wrapping_add(1);
            slot.touched = false;
            self.free.push(key.index);
        }
    }

    /// Frees every live buffer. Used on renderer teardown.
    pub fn clear(&mut self, backend: &mut dyn Backend) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(layer) = slot.layer.take() {
                backend.free_instance_buffer(layer.buffer);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.by_id.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Call, RecordingBackend};
    use crate::backend::{BackendKind, TextureData};
    use crate::coords::Vec2;
    use crate::scene::{Sprite, ZIndex};

    const LIMITS: LayerLimits = LayerLimits { static_capacity: 8, dynamic_capacity: 4, lifetime: 3 };

    fn layer(id: u32, kind: LayerKind, n: usize) -> SceneLayer {
        let mut l = SceneLayer::new(LayerId(id), ZIndex(0), kind);
        for i in 0..n {
            l.push(Sprite::new("atlas", Vec2::new(i as f32, 0.0), Vec2::new(1.0, 1.0)));
        }
        l
    }

    fn backend() -> RecordingBackend {
        let mut b = RecordingBackend::new(BackendKind::Gles3);
        b.load_texture(&TextureData::new("atlas", 1, 1, vec![255; 4])).unwrap();
        b
    }

    fn writes(b: &RecordingBackend) -> usize {
        b.log().borrow().count(|c| matches!(c, Call::WriteInstances { .. }))
    }

    // ── upload policy ─────────────────────────────────────────────────────

    #[test]
    fn static_layer_uploads_once() {
        let mut b = backend();
        let mut table = LayerTable::new(LIMITS);
        let mut scene = vec![layer(1, LayerKind::Static, 2)];

        table.sync(&scene, &mut b).unwrap();
        scene[0].push(Sprite::new("atlas", Vec2::ZERO, Vec2::new(1.0, 1.0)));
        table.sync(&scene, &mut b).unwrap();

        assert_eq!(writes(&b), 1);
        assert_eq!(table.get(LayerId(1)).unwrap().draw_calls[0].instance_count, 2);
    }

    #[test]
    fn invalidate_forces_static_reupload() {
        let mut b = backend();
        let mut table = LayerTable::new(LIMITS);
        let mut scene = vec![layer(1, LayerKind::Static, 2)];

        table.sync(&scene, &mut b).unwrap();
        scene[0].push(Sprite::new("atlas", Vec2::ZERO, Vec2::new(1.0, 1.0)));
        table.invalidate(LayerId(1));
        table.sync(&scene, &mut b).unwrap();

        assert_eq!(writes(&b), 2);
        assert_eq!(table.get(LayerId(1)).unwrap().draw_calls[0].instance_count, 3);
    }

    #[test]
    fn dynamic_layer_uploads_only_when_dirty() {
        let mut b = backend();
        let mut table = LayerTable::new(LIMITS);
        let mut scene = vec![layer(1, LayerKind::Dynamic, 1)];

        table.sync(&scene, &mut b).unwrap();
        table.sync(&scene, &mut b).unwrap();
        assert_eq!(writes(&b), 1);

        scene[0].mark_dirty();
        table.sync(&scene, &mut b).unwrap();
        assert_eq!(writes(&b), 2);
    }

    #[test]
    fn overflow_is_truncated_to_capacity() {
        let mut b = backend();
        let mut table = LayerTable::new(LIMITS);
        table.sync(&[layer(1, LayerKind::Dynamic, 10)], &mut b).unwrap();

        let log = b.log();
        let log = log.borrow();
        assert!(log.calls.contains(&Call::WriteInstances { id: crate::backend::BufferId(0), count: 4 }));
        assert_eq!(table.get(LayerId(1)).unwrap().draw_calls[0].instance_count, 4);
    }

    #[test]
    fn capacity_follows_kind() {
        let mut b = backend();
        let mut table = LayerTable::new(LIMITS);
        table
            .sync(&[layer(1, LayerKind::Static, 0), layer(2, LayerKind::Dynamic, 0)], &mut b)
            .unwrap();
        assert_eq!(table.get(LayerId(1)).unwrap().capacity, 8);
        assert_eq!(table.get(LayerId(2)).unwrap().capacity, 4);
    }

    #[test]
    fn kind_change_recreates_the_layer() {
        let mut b = backend();
        let mut table = LayerTable::new(LIMITS);

        table.sync(&[layer(1, LayerKind::Static, 2)], &mut b).unwrap();
        let mut scene = vec![layer(1, LayerKind::Dynamic, 2)];
        table.sync(&scene, &mut b).unwrap();

        let mirror = table.get(LayerId(1)).unwrap();
        assert_eq!((mirror.kind, mirror.capacity), (LayerKind::Dynamic, 4));
        assert_eq!(b.log().borrow().count(|c| matches!(c, Call::FreeBuffer(_))), 1);
        assert_eq!(b.log().borrow().live_buffers(), 1);
        assert_eq!(table.len(), 1);

        scene[0].mark_dirty();
        table.sync(&scene, &mut b).unwrap();
        assert_eq!(writes(&b), 3);
    }

    // ── garbage collection ────────────────────────────────────────────────

    #[test]
    fn unreferenced_layer_is_evicted_after_lifetime_and_freed_once() {
        let mut b = backend();
        let mut table = LayerTable::new(LIMITS);

        table.sync(&[layer(1, LayerKind::Static, 1)], &mut b).unwrap();
        table.collect_garbage(&mut b);

        for frame in 0..LIMITS.lifetime {
            assert!(table.get(LayerId(1)).is_some(), "evicted early at frame {frame}");
            table.sync(&[], &mut b).unwrap();
            table.collect_garbage(&mut b);
        }
        assert!(table.get(LayerId(1)).is_none());

        for _ in 0..5 {
            table.collect_garbage(&mut b);
        }
        assert_eq!(b.log().borrow().count(|c| matches!(c, Call::FreeBuffer(_))), 1);
        assert_eq!(b.log().borrow().live_buffers(), 0);
    }

    #[test]
    fn referenced_layer_survives_indefinitely() {
        let mut b = backend();
        let mut table = LayerTable::new(LIMITS);
        let scene = vec![layer(1, LayerKind::Dynamic, 1)];

        for _ in 0..20 {
            table.sync(&scene, &mut b).unwrap();
            table.collect_garbage(&mut b);
        }
        assert!(table.get(LayerId(1)).is_some());
    }

    #[test]
    fn evicted_id_is_recreated_in_a_reused_slot() {
        let mut b = backend();
        let mut table = LayerTable::new(LayerLimits { lifetime: 1, ..LIMITS });

        table.sync(&[layer(1, LayerKind::Static, 1)], &mut b).unwrap();
        table.collect_garbage(&mut b);
        table.collect_garbage(&mut b);
        assert!(table.is_empty());

        table.sync(&[layer(2, LayerKind::Static, 1)], &mut b).unwrap();
        assert_eq!(table.slots.len(), 1);
        assert!(table.get(LayerId(1)).is_none());
        assert!(table.get(LayerId(2)).is_some());
    }
}
