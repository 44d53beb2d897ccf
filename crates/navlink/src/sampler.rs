//! Triangle collection and surface sampling
//!
//! Triangles are gathered from the host geometry inside the sampling
//! volume, filtered by slope, and covered with low-discrepancy barycentric
//! samples. Each sample is kept only if the host can snap it onto the
//! bridging area.

use glam::Vec3;
use navlink_common::{triangle_aabb_intersect, walkable_threshold, Aabb, Error, Result, Triangle};

use crate::config::AnalysisConfig;
use crate::context::AnalysisContext;
use crate::halton::PointSource;
use crate::host::{AreaMask, GeometrySource, NavigationOracle};

/// Gathers the triangles of every source mesh that touch `bounds`.
///
/// Meshes entirely inside the volume are taken whole; meshes straddling it
/// are filtered triangle by triangle with the exact box test.
pub fn collect_triangles<S: GeometrySource + ?Sized>(
    source: &S,
    bounds: &Aabb,
    layer_mask: u32,
) -> Result<Vec<Triangle>> {
    let mut triangles = Vec::new();

    for mesh in source.collect_meshes(bounds, layer_mask) {
        if !mesh.in_layer_mask(layer_mask) {
            continue;
        }
        let Some(mesh_bounds) = mesh.bounds() else {
            continue;
        };
        if !bounds.intersects(&mesh_bounds) {
            continue;
        }

        let fully_inside = bounds.contains_aabb(&mesh_bounds);
        let before = triangles.len();

        for i in 0..mesh.triangle_count() {
            let [a, b, c] = mesh.triangle(i).ok_or_else(|| {
                Error::InvalidMesh(format!("Triangle {} has an out of range index", i))
            })?;
            if fully_inside || triangle_aabb_intersect(bounds, a, b, c) {
                triangles.push(Triangle::new(a, b, c));
            }
        }

        log::debug!(
            "collected {} of {} triangles from mesh on layer {}{}",
            triangles.len() - before,
            mesh.triangle_count(),
            mesh.layer,
            if fully_inside { " (fully inside)" } else { "" }
        );
    }

    Ok(triangles)
}

/// Attempt count above which a triangle is reported as oversized
pub const LARGE_TRIANGLE_SAMPLES: usize = 100_000;

/// Number of samples attempted on a triangle of the given area
#[inline]
pub fn sample_count(area: f32, area_per_sample: f32) -> usize {
    let count = (area / area_per_sample).ceil();
    if count.is_finite() && count > 0.0 {
        count as usize
    } else {
        0
    }
}

/// Samples points on every walkable triangle.
///
/// Returns all accepted points; each is also recorded in the `samples` of
/// the triangle it came from. Failed snaps are dropped without retry.
pub fn sample_points<O: NavigationOracle + ?Sized>(
    triangles: &mut [Triangle],
    points: &mut PointSource<'_>,
    oracle: &O,
    config: &AnalysisConfig,
    bridge_mask: AreaMask,
    ctx: &mut AnalysisContext,
) -> Vec<Vec3> {
    let min_slope_cos = walkable_threshold(config.max_slope_angle);
    let mut result = Vec::new();
    let mut steep = 0usize;

    for tri in triangles.iter_mut() {
        if tri.slope_cos() < min_slope_cos {
            steep += 1;
            continue;
        }

        let count = sample_count(tri.area(), config.area_per_sample);
        if count > LARGE_TRIANGLE_SAMPLES {
            ctx.stats.large_triangles += 1;
            log::warn!(
                "triangle of area {:.1} needs {} sample attempts; consider splitting it or raising the area per sample",
                tri.area(),
                count
            );
        }

        for _ in 0..count {
            let (u, v) = points.next_pair();
            let pos = tri.barycentric(u, v);
            ctx.stats.sample_attempts += 1;

            if !config.bounds.contains_point(pos) {
                continue;
            }

            ctx.stats.snap_queries += 1;
            if let Some(hit) = oracle.snap_to_surface(pos, config.surface_snap_radius, bridge_mask)
            {
                result.push(hit);
                tri.samples.push(hit);
            }
        }
    }

    ctx.stats.samples += result.len();
    log::debug!(
        "sampled {} points from {} triangles ({} too steep)",
        result.len(),
        triangles.len(),
        steep
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::halton::HaltonTable;
    use crate::host::{PathStatus, SourceMesh};
    use std::cell::Cell;

    /// Returns fixed meshes regardless of the query
    struct FixedSource(Vec<SourceMesh>);

    impl GeometrySource for FixedSource {
        fn collect_meshes(&self, _bounds: &Aabb, _layer_mask: u32) -> Vec<SourceMesh> {
            self.0.clone()
        }
    }

    /// Snaps points with `y <= 0.1` onto y = 0 and counts queries
    struct FloorOracle {
        queries: Cell<usize>,
    }

    impl NavigationOracle for FloorOracle {
        fn snap_to_surface(&self, point: Vec3, _radius: f32, _mask: AreaMask) -> Option<Vec3> {
            self.queries.set(self.queries.get() + 1);
            (point.y <= 0.1).then(|| Vec3::new(point.x, 0.0, point.z))
        }

        fn path_status(&self, _start: Vec3, _end: Vec3, _mask: AreaMask) -> PathStatus {
            PathStatus::Invalid
        }

        fn area_mask(&self, _name: &str) -> Option<AreaMask> {
            Some(1)
        }
    }

    fn floor_oracle() -> FloorOracle {
        FloorOracle {
            queries: Cell::new(0),
        }
    }

    /// Square of side `size` at height `y` starting at `origin` (x, z)
    fn square(origin: (f32, f32), size: f32, y: f32) -> SourceMesh {
        let (x0, z0) = origin;
        SourceMesh::new(
            vec![
                Vec3::new(x0, y, z0),
                Vec3::new(x0 + size, y, z0),
                Vec3::new(x0 + size, y, z0 + size),
                Vec3::new(x0, y, z0 + size),
            ],
            vec![0, 3, 2, 0, 2, 1],
        )
    }

    fn config(bounds: Aabb) -> AnalysisConfig {
        AnalysisConfig::with_bounds(bounds)
    }

    #[test]
    fn test_sample_count() {
        assert_eq!(sample_count(12.5, 2.0), 7);
        assert_eq!(sample_count(4.0, 2.0), 2);
        assert_eq!(sample_count(0.01, 2.0), 1);
        assert_eq!(sample_count(0.0, 2.0), 0);
        assert_eq!(sample_count(f32::NAN, 2.0), 0);
    }

    #[test]
    fn test_collect_fully_inside_mesh() {
        let source = FixedSource(vec![square((0.0, 0.0), 2.0, 0.0)]);
        let bounds = Aabb::new(Vec3::splat(-1.0), Vec3::splat(3.0));
        let tris = collect_triangles(&source, &bounds, u32::MAX).unwrap();
        assert_eq!(tris.len(), 2);
    }

    #[test]
    fn test_collect_partial_mesh_uses_box_test() {
        // Two squares in one mesh: one overlapping the box, one outside it
        let mut mesh = square((0.0, 0.0), 1.0, 0.0);
        let far = square((5.0, 5.0), 1.0, 0.0);
        let offset = mesh.vertices.len() as u32;
        mesh.vertices.extend(far.vertices);
        mesh.indices.extend(far.indices.iter().map(|i| i + offset));

        let source = FixedSource(vec![mesh]);
        let bounds = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(2.0, 1.0, 2.0));
        let tris = collect_triangles(&source, &bounds, u32::MAX).unwrap();
        assert_eq!(tris.len(), 2);
        assert!(tris.iter().all(|t| t.a.x < 2.0));
    }

    #[test]
    fn test_collect_skips_outside_and_other_layers() {
        let mut other_layer = square((0.0, 0.0), 1.0, 0.0);
        other_layer.layer = 4;
        let source = FixedSource(vec![square((10.0, 10.0), 1.0, 0.0), other_layer]);
        let bounds = Aabb::new(Vec3::splat(-1.0), Vec3::splat(2.0));
        let tris = collect_triangles(&source, &bounds, 0b1).unwrap();
        assert!(tris.is_empty());
    }

    #[test]
    fn test_collect_rejects_bad_indices() {
        let mut mesh = square((0.0, 0.0), 1.0, 0.0);
        mesh.indices[1] = 42;
        let source = FixedSource(vec![mesh]);
        let bounds = Aabb::new(Vec3::new(0.5, -1.0, 0.5), Vec3::new(2.0, 1.0, 2.0));
        assert!(matches!(
            collect_triangles(&source, &bounds, u32::MAX),
            Err(Error::InvalidMesh(_))
        ));
    }

    #[test]
    fn test_sample_flat_square() {
        let bounds = Aabb::new(Vec3::new(-0.5, -1.0, -0.5), Vec3::new(10.5, 1.0, 10.5));
        let source = FixedSource(vec![square((0.0, 0.0), 10.0, 0.0)]);
        let mut tris = collect_triangles(&source, &bounds, u32::MAX).unwrap();

        let table = HaltonTable::generate(256).unwrap();
        let mut points = table.source();
        let oracle = floor_oracle();
        let mut ctx = AnalysisContext::new();

        let samples = sample_points(
            &mut tris,
            &mut points,
            &oracle,
            &config(bounds),
            1,
            &mut ctx,
        );

        // Two triangles of area 50, ceil(50 / 2) samples each
        assert_eq!(samples.len(), 50);
        assert_eq!(points.cursor(), 50);
        assert_eq!(oracle.queries.get(), 50);
        assert_eq!(tris[0].samples.len() + tris[1].samples.len(), 50);
        assert!(samples.iter().all(|p| bounds.contains_point(*p)));
        assert_eq!(ctx.stats.samples, 50);
    }

    #[test]
    fn test_steep_triangles_skipped() {
        // A vertical wall
        let wall = SourceMesh::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(4.0, 0.0, 0.0),
                Vec3::new(0.0, 4.0, 0.0),
            ],
            vec![0, 1, 2],
        );
        let bounds = Aabb::new(Vec3::splat(-1.0), Vec3::splat(5.0));
        let mut tris = collect_triangles(&FixedSource(vec![wall]), &bounds, u32::MAX).unwrap();
        assert_eq!(tris.len(), 1);

        let table = HaltonTable::generate(16).unwrap();
        let oracle = floor_oracle();
        let mut ctx = AnalysisContext::new();
        let samples = sample_points(
            &mut tris,
            &mut table.source(),
            &oracle,
            &config(bounds),
            1,
            &mut ctx,
        );
        assert!(samples.is_empty());
        assert_eq!(ctx.stats.sample_attempts, 0);
    }

    #[test]
    fn test_out_of_bounds_samples_not_queried() {
        // Triangle mostly outside the sampling volume
        let bounds = Aabb::new(Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let mut tris = vec![Triangle::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 20.0),
            Vec3::new(20.0, 0.0, 0.0),
        )];
        let table = HaltonTable::generate(512).unwrap();
        let oracle = floor_oracle();
        let mut ctx = AnalysisContext::new();
        let samples = sample_points(
            &mut tris,
            &mut table.source(),
            &oracle,
            &config(bounds),
            1,
            &mut ctx,
        );

        assert_eq!(ctx.stats.sample_attempts, 100);
        assert!(oracle.queries.get() < 100);
        assert_eq!(samples.len(), oracle.queries.get());
        assert!(samples.iter().all(|p| bounds.contains_point(*p)));
    }

    #[test]
    fn test_failed_snaps_are_dropped() {
        // Floor at y = 0.5 is above what the oracle accepts
        let bounds = Aabb::new(Vec3::new(-0.5, 0.0, -0.5), Vec3::new(4.5, 1.0, 4.5));
        let source = FixedSource(vec![square((0.0, 0.0), 4.0, 0.5)]);
        let mut tris = collect_triangles(&source, &bounds, u32::MAX).unwrap();
        let table = HaltonTable::generate(64).unwrap();
        let oracle = floor_oracle();
        let mut ctx = AnalysisContext::new();
        let samples = sample_points(
            &mut tris,
            &mut table.source(),
            &oracle,
            &config(bounds),
            1,
            &mut ctx,
        );
        assert!(samples.is_empty());
        assert_eq!(oracle.queries.get(), 8);
        assert!(tris.iter().all(|t| t.samples.is_empty()));
    }

    #[test]
    fn test_oversized_triangle_reported() {
        // Large ground triangle only partly inside a small volume
        let bounds = Aabb::new(Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let mut tris = vec![
            Triangle::new(
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 20.0),
                Vec3::new(20.0, 0.0, 0.0),
            ),
            Triangle::new(
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 0.0),
            ),
        ];
        let mut cfg = config(bounds);
        cfg.area_per_sample = 0.001;

        let table = HaltonTable::generate(64).unwrap();
        let mut ctx = AnalysisContext::new();
        sample_points(
            &mut tris,
            &mut table.source(),
            &floor_oracle(),
            &cfg,
            1,
            &mut ctx,
        );

        // 200 / 0.001 attempts for the big one, 500 for the small one
        assert_eq!(ctx.stats.large_triangles, 1);
        assert!(ctx.stats.sample_attempts > LARGE_TRIANGLE_SAMPLES);
    }

    #[test]
    fn test_degenerate_triangle_not_sampled() {
        let bounds = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let mut tris = vec![Triangle::new(Vec3::ZERO, Vec3::ZERO, Vec3::X)];
        let table = HaltonTable::generate(4).unwrap();
        let mut ctx = AnalysisContext::new();
        let samples = sample_points(
            &mut tris,
            &mut table.source(),
            &floor_oracle(),
            &config(bounds),
            1,
            &mut ctx,
        );
        assert!(samples.is_empty());
        assert_eq!(ctx.stats.sample_attempts, 0);
    }
}
