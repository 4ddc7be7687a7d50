use crate::coords::{Rect, SurfaceSize, Vec2, Viewport};

/// World-space view: `origin` is the world point at the top-left of the surface and `zoom`
/// is pixels per world unit.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub origin: Vec2,
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self { origin: Vec2::ZERO, zoom: 1.0 }
    }
}

impl Camera {
    #[inline]
    pub const fn new(origin: Vec2, zoom: f32) -> Self {
        Self { origin, zoom }
    }

    #[inline]
    pub fn viewport(&self, surface: SurfaceSize) -> Viewport {
        Viewport::from_surface(surface, self.zoom)
    }

    /// World rectangle visible on a surface of `surface` pixels.
    pub fn visible_bounds(&self, surface: SurfaceSize) -> Rect {
        let vp = self.viewport(surface);
        Rect::from_origin_size(self.origin, Vec2::new(vp.width, vp.height))
    }

    /// `(origin.x, origin.y, width, height)` as consumed by the sprite, light and shadow
    /// vertex programs.
    pub fn view_uniform(&self, surface: SurfaceSize) -> [f32; 4] {
        let vp = self.viewport(surface);
        [self.origin.x, self.origin.y, vp.width, vp.height]
    }
}
