use super::Vec2;

/// Axis-aligned rectangle in world units: `origin` is the top-left corner.
///
/// A negative `size` component is tolerated; [`Rect::normalized`] flips it.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::from_origin_size(Vec2::new(x, y), Vec2::new(w, h))
    }

    #[inline]
    pub const fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    /// Square bounds of a circle.
    #[inline]
    pub fn around(center: Vec2, radius: f32) -> Self {
        let r = Vec2::new(radius, radius);
        Self::from_origin_size(center - r, r * 2.0)
    }

    /// Smallest rectangle containing every point, or `None` for an empty input.
    pub fn bounding(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let (lo, hi) = rest.iter().fold((*first, *first), |(lo, hi), p| {
            (Vec2::new(lo.x.min(p.x), lo.y.min(p.y)), Vec2::new(hi.x.max(p.x), hi.y.max(p.y)))
        });
        Some(Self::from_origin_size(lo, hi - lo))
    }

    #[inline]
    pub fn min(self) -> Vec2 {
        self.origin
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.origin.is_finite() && self.size.is_finite()
    }

    /// Same area with non-negative width and height.
    pub fn normalized(self) -> Self {
        let axis = |o: f32, s: f32| if s < 0.0 { (o + s, -s) } else { (o, s) };
        let (x, w) = axis(self.origin.x, self.size.x);
        let (y, h) = axis(self.origin.y, self.size.y);
        Self::new(x, y, w, h)
    }

    /// Closed overlap test: touching edges count.
    ///
    /// Culling relies on this so a light that just grazes the view is still drawn.
    pub fn overlaps(self, other: Rect) -> bool {
        let (a, b) = (self.normalized(), other.normalized());
        let (a_max, b_max) = (a.max(), b.max());
        a.origin.x <= b_max.x && b.origin.x <= a_max.x && a.origin.y <= b_max.y && b.origin.y <= a_max.y
    }
}
