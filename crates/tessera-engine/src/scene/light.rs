use crate::coords::{ColorRgba, Rect, Vec2};

/// A point or spot light in world units.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub position: Vec2,
    pub radius: f32,
    pub color: ColorRgba,
    pub intensity: f32,
    /// Facing angle in radians (0 = +X). Ignored for omni lights.
    pub direction: f32,
    /// Half-angle of the spot cone in radians; `None` for an omni light.
    pub spot_cutoff: Option<f32>,
}

impl Light {
    pub fn omni(position: Vec2, radius: f32, color: ColorRgba, intensity: f32) -> Self {
        Self {
            position,
            radius,
            color,
            intensity,
            direction: 0.0,
            spot_cutoff: None,
        }
    }

    pub fn spot(mut self, direction: f32, half_angle: f32) -> Self {
        self.direction = direction;
        self.spot_cutoff = Some(half_angle);
        self
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::around(self.position, self.radius)
    }
}

/// Closed polygon outline that blocks light. The last point connects back to the first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Collider {
    pub points: Vec<Vec2>,
}

impl Collider {
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points }
    }

    /// Axis-aligned box collider.
    pub fn rect(r: Rect) -> Self {
        let (lo, hi) = (r.min(), r.max());
        Self::new(vec![lo, Vec2::new(hi.x, lo.y), hi, Vec2::new(lo.x, hi.y)])
    }

    /// Edges as `(start, end)` pairs, closing the outline. Fewer than two points yield none.
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let n = if self.points.len() < 2 { 0 } else { self.points.len() };
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    #[inline]
    pub fn bounds(&self) -> Option<Rect> {
        Rect::bounding(&self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_collider_has_four_closed_edges() {
        let c = Collider::rect(Rect::new(0.0, 0.0, 2.0, 1.0));
        let edges: Vec<_> = c.edges().collect();
        assert_eq!(edges.len(), 4);
        assert_eq!(edges[3], (Vec2::new(0.0, 1.0), Vec2::new(0.0, 0.0)));
    }

    #[test]
    fn single_point_has_no_edges() {
        let c = Collider::new(vec![Vec2::new(1.0, 1.0)]);
        assert_eq!(c.edges().count(), 0);
    }
}
