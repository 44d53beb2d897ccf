//! Interfaces to the host environment
//!
//! The analysis never builds or walks a navigation mesh itself. Geometry
//! comes from a [`GeometrySource`] and every surface or reachability
//! question is answered by a [`NavigationOracle`].

use glam::Vec3;
use navlink_common::{Aabb, Error, Result};

/// Bitmask of area classes
pub type AreaMask = u32;

/// Outcome of a reachability query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    /// A path reaches the target
    Complete,
    /// A path exists but ends short of the target
    Partial,
    /// No path could be computed
    Invalid,
}

impl PathStatus {
    /// Only a complete path connects two points
    #[inline]
    pub fn is_complete(&self) -> bool {
        *self == PathStatus::Complete
    }
}

/// Resolved masks of the three area classes an analysis works with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaMasks {
    /// Area used for sampling and reachability
    pub bridge: AreaMask,
    /// First traversal class
    pub class_one: AreaMask,
    /// Second traversal class
    pub class_two: AreaMask,
}

impl AreaMasks {
    /// Looks up each named class through the oracle
    pub fn resolve<O: NavigationOracle + ?Sized>(
        oracle: &O,
        bridge: &str,
        class_one: &str,
        class_two: &str,
    ) -> Result<Self> {
        let lookup = |name: &str| {
            oracle
                .area_mask(name)
                .ok_or_else(|| Error::UnknownArea(name.to_string()))
        };
        Ok(Self {
            bridge: lookup(bridge)?,
            class_one: lookup(class_one)?,
            class_two: lookup(class_two)?,
        })
    }
}

/// Renderable geometry handed out by the host
#[derive(Debug, Clone, Default)]
pub struct SourceMesh {
    /// Vertex positions in world space
    pub vertices: Vec<Vec3>,
    /// Triangle list, 3 indices per triangle
    pub indices: Vec<u32>,
    /// Layer the mesh belongs to (bit index into a layer mask)
    pub layer: u32,
}

impl SourceMesh {
    /// Creates a mesh on layer 0
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            layer: 0,
        }
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Corners of triangle `i`, or `None` if an index is out of range
    pub fn triangle(&self, i: usize) -> Option<[Vec3; 3]> {
        let t = self.indices.get(i * 3..i * 3 + 3)?;
        Some([
            *self.vertices.get(t[0] as usize)?,
            *self.vertices.get(t[1] as usize)?,
            *self.vertices.get(t[2] as usize)?,
        ])
    }

    /// Bounds of all vertices
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(&self.vertices)
    }

    /// Checks whether the mesh is on a layer selected by `layer_mask`
    #[inline]
    pub fn in_layer_mask(&self, layer_mask: u32) -> bool {
        self.layer < 32 && layer_mask & (1 << self.layer) != 0
    }
}

/// Supplies the renderable geometry inside a volume
pub trait GeometrySource {
    /// Returns meshes on the given layers that may touch `bounds`
    fn collect_meshes(&self, bounds: &Aabb, layer_mask: u32) -> Vec<SourceMesh>;
}

/// Answers surface and reachability queries against the host navmesh
pub trait NavigationOracle {
    /// Projects `point` onto the nearest surface of an area in `mask`
    /// within `radius`
    fn snap_to_surface(&self, point: Vec3, radius: f32, mask: AreaMask) -> Option<Vec3>;

    /// Computes whether a path over areas in `mask` connects `start` and `end`
    fn path_status(&self, start: Vec3, end: Vec3, mask: AreaMask) -> PathStatus;

    /// Resolves a named area class to its mask bit
    fn area_mask(&self, name: &str) -> Option<AreaMask>;
}

impl<T: GeometrySource + ?Sized> GeometrySource for &T {
    fn collect_meshes(&self, bounds: &Aabb, layer_mask: u32) -> Vec<SourceMesh> {
        (**self).collect_meshes(bounds, layer_mask)
    }
}

impl<T: NavigationOracle + ?Sized> NavigationOracle for &T {
    fn snap_to_surface(&self, point: Vec3, radius: f32, mask: AreaMask) -> Option<Vec3> {
        (**self).snap_to_surface(point, radius, mask)
    }

    fn path_status(&self, start: Vec3, end: Vec3, mask: AreaMask) -> PathStatus {
        (**self).path_status(start, end, mask)
    }

    fn area_mask(&self, name: &str) -> Option<AreaMask> {
        (**self).area_mask(name)
    }
}
