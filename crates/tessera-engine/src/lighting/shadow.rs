use crate::coords::Vec2;
use crate::scene::Collider;

const MIN_EDGE: f32 = 1e-4;

/// Appends shadow-volume triangles cast by `collider` from a light at `light` with `radius`.
///
/// Each edge `(a, b)` is extruded away from the light by `radius`, giving the quad
/// `a, b, b', a'` as two triangles. Zero-length edges and edges touching the light position
/// are skipped.
pub fn extrude_shadows(light: Vec2, radius: f32, collider: &Collider, out: &mut Vec<[f32; 2]>) {
    for (a, b) in collider.edges() {
        if (b - a).length() < MIN_EDGE {
            continue;
        }
        let (da, db) = ((a - light).normalized(), (b - light).normalized());
        if da == Vec2::ZERO || db == Vec2::ZERO {
            continue;
        }

        let a_far = a + da * radius;
        let b_far = b + db * radius;
        out.extend_from_slice(&[
            a.to_array(),
            b.to_array(),
            b_far.to_array(),
            a.to_array(),
            b_far.to_array(),
            a_far.to_array(),
        ]);
    }
}
