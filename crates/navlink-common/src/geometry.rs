//! 3D geometry kernel
//!
//! Triangle/box overlap via the separating axis theorem, and closest point
//! queries used when projecting samples onto a surface.

use crate::Aabb;
use glam::Vec3;

/// Tests whether a triangle intersects an axis-aligned box.
///
/// Thirteen candidate axes are projected: the three box face normals, the
/// triangle normal, and the nine cross products of box axes with triangle
/// edges. The shapes are disjoint iff one of them separates the projected
/// intervals. Touching counts as intersecting.
pub fn triangle_aabb_intersect(aabb: &Aabb, a: Vec3, b: Vec3, c: Vec3) -> bool {
    let center = aabb.center();
    let extents = aabb.half_extents();

    // Triangle in box-local coordinates
    let v0 = a - center;
    let v1 = b - center;
    let v2 = c - center;

    let f0 = v1 - v0;
    let f1 = v2 - v1;
    let f2 = v0 - v2;

    let axes = [
        Vec3::X.cross(f0),
        Vec3::X.cross(f1),
        Vec3::X.cross(f2),
        Vec3::Y.cross(f0),
        Vec3::Y.cross(f1),
        Vec3::Y.cross(f2),
        Vec3::Z.cross(f0),
        Vec3::Z.cross(f1),
        Vec3::Z.cross(f2),
        Vec3::X,
        Vec3::Y,
        Vec3::Z,
        f0.cross(f1),
    ];

    for axis in axes {
        // Parallel edges produce a null axis which carries no information
        if axis == Vec3::ZERO {
            continue;
        }
        if is_separating_axis(axis, extents, v0, v1, v2) {
            return false;
        }
    }

    true
}

/// Returns true if `axis` separates a box of half size `extents` centred at
/// the origin from the triangle `v0, v1, v2`.
#[inline]
fn is_separating_axis(axis: Vec3, extents: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> bool {
    let p0 = v0.dot(axis);
    let p1 = v1.dot(axis);
    let p2 = v2.dot(axis);

    let r = extents.x * axis.x.abs() + extents.y * axis.y.abs() + extents.z * axis.z.abs();

    // Equivalent to `min(p) > r || max(p) < -r`
    (-p0.max(p1).max(p2)).max(p0.min(p1).min(p2)) > r
}

/// Finds the point on triangle `a, b, c` closest to `p`.
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = va + vb + vc;
    if denom.abs() <= f32::EPSILON {
        // Degenerate triangle, fall back to the nearest vertex
        return [a, b, c]
            .into_iter()
            .min_by(|x, y| p.distance_squared(*x).total_cmp(&p.distance_squared(*y)))
            .unwrap_or(a);
    }
    let inv = 1.0 / denom;
    let v = vb * inv;
    let w = vc * inv;
    a + ab * v + ac * w
}
