//! Batching layer: scene layers mirrored into backend instance buffers.
//!
//! Responsibilities:
//! - create a [`RendererLayer`] lazily the first time a scene layer is seen
//! - upload instance data according to the layer's [`crate::scene::LayerKind`]
//! - compact sprites into same-texture [`crate::backend::DrawCall`] runs
//! - evict layers the scene stopped referencing

mod draw_call;
mod layer;
mod table;

pub use draw_call::compute_draw_calls;
pub use layer::RendererLayer;
pub use table::{LayerLimits, LayerTable};

/// Default number of unreferenced frames before a layer is evicted.
pub const LAYER_LIFETIME: u32 = 60;
