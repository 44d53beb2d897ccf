//! Source triangles gathered for sampling

use glam::Vec3;

use crate::UP;

/// A triangle collected from source geometry, together with the surface
/// samples it produced during one sampling pass
#[derive(Debug, Clone)]
pub struct Triangle {
    /// First vertex
    pub a: Vec3,
    /// Second vertex
    pub b: Vec3,
    /// Third vertex
    pub c: Vec3,
    /// Unit normal of `(b - a) × (c - a)`, zero when degenerate
    pub normal: Vec3,
    area: f32,
    /// Surface points sampled from this triangle
    pub samples: Vec<Vec3>,
}

impl Triangle {
    /// Creates a triangle and caches its normal and area
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let normal = (b - a).cross(c - a).normalize_or_zero();
        Self {
            a,
            b,
            c,
            normal,
            area: Self::compute_area(a, b, c),
            samples: Vec::new(),
        }
    }

    /// Area from two edge lengths and the sine of their enclosed angle
    fn compute_area(a: Vec3, b: Vec3, c: Vec3) -> f32 {
        let ab = b - a;
        let ac = c - a;
        let cos_theta = ab
            .normalize_or_zero()
            .dot(ac.normalize_or_zero())
            .clamp(-1.0, 1.0);
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
        0.5 * ab.length() * ac.length() * sin_theta
    }

    /// Cached surface area
    #[inline]
    pub fn area(&self) -> f32 {
        self.area
    }

    /// Cosine of the angle between the normal and world up
    #[inline]
    pub fn slope_cos(&self) -> f32 {
        self.normal.dot(UP)
    }

    /// Point at barycentric weights `(u, v, 1 - u - v)` over `(a, b, c)`
    #[inline]
    pub fn barycentric(&self, u: f32, v: f32) -> Vec3 {
        let w = 1.0 - (u + v);
        self.a * u + self.b * v + self.c * w
    }
}
