/// RGBA color in linear space.
///
/// Backends blend premultiplied, so tints and clear colors are read that way.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgba {
    pub const TRANSPARENT: ColorRgba = ColorRgba::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: ColorRgba = ColorRgba::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: ColorRgba = ColorRgba::new(1.0, 1.0, 1.0, 1.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color with the RGB channels multiplied by `k` (ambient and light intensity).
    #[inline]
    pub fn scaled_rgb(self, k: f32) -> Self {
        Self::new(self.r * k, self.g * k, self.b * k, 1.0)
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.to_array().iter().all(|c| c.is_finite())
    }
}

impl From<[f32; 4]> for ColorRgba {
    #[inline]
    fn from([r, g, b, a]: [f32; 4]) -> Self {
        Self::new(r, g, b, a)
    }
}
