use super::SurfaceSize;

/// Extent of the camera's view in world units.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    /// World extent shown by a `size`-pixel surface when one world unit spans `zoom` pixels.
    ///
    /// Non-positive or non-finite zoom is read as 1.
    pub fn from_surface(size: SurfaceSize, zoom: f32) -> Self {
        let zoom = Some(zoom).filter(|z| *z > 0.0 && z.is_finite()).unwrap_or(1.0);
        Self {
            width: size.width as f32 / zoom,
            height: size.height as f32 / zoom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_shrinks_the_world_extent() {
        let v = Viewport::from_surface(SurfaceSize::new(800, 600), 2.0);
        assert_eq!((v.width, v.height), (400.0, 300.0));
    }

    #[test]
    fn invalid_zoom_falls_back_to_one() {
        for zoom in [0.0, -3.0, f32::NAN] {
            let v = Viewport::from_surface(SurfaceSize::new(10, 20), zoom);
            assert_eq!((v.width, v.height), (10.0, 20.0));
        }
    }
}
