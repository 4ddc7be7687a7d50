//! Caller-owned scene description consumed by [`crate::Renderer::render`].
//!
//! The renderer never mutates the scene. Layers are identified by [`LayerId`] across frames;
//! everything else (lights, colliders, ambient) is re-read each frame.

mod camera;
mod layer;
mod light;
mod z_index;

pub use camera::Camera;
pub use layer::{LayerId, LayerKind, SceneLayer, Sprite};
pub use light::{Collider, Light};
pub use z_index::ZIndex;

use crate::coords::ColorRgba;

#[derive(Debug, Clone)]
pub struct Scene {
    pub layers: Vec<SceneLayer>,
    pub lights: Vec<Light>,
    pub colliders: Vec<Collider>,
    pub ambient_color: ColorRgba,
    pub ambient_intensity: f32,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            lights: Vec::new(),
            colliders: Vec::new(),
            ambient_color: ColorRgba::WHITE,
            ambient_intensity: 1.0,
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut SceneLayer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    /// Color the lightmap is cleared to before any light is drawn.
    #[inline]
    pub fn ambient(&self) -> ColorRgba {
        self.ambient_color.scaled_rgb(self.ambient_intensity)
    }
}
