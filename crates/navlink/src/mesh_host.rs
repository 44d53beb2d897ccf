//! Reference host built on an area-tagged triangle mesh
//!
//! Stands in for an engine navmesh: each triangle carries an area bitmask,
//! surface snapping projects onto the closest matching triangle, and two
//! points are reachable when their triangles share an edge-connected
//! component of matching triangles.

use std::collections::{HashMap, VecDeque};

use glam::Vec3;
use navlink_common::{closest_point_on_triangle, Aabb, Error, Result, TriMesh};

use crate::host::{AreaMask, GeometrySource, NavigationOracle, PathStatus, SourceMesh};

/// Maximum number of named area classes
pub const MAX_AREA_CLASSES: usize = 32;

/// Distance within which path endpoints must lie on the surface
pub const PATH_ENDPOINT_RADIUS: f32 = 0.5;

/// Vertex positions are welded at this resolution when finding shared edges
const VERTEX_WELD_SCALE: f32 = 1000.0;

type VertexKey = (i32, i32, i32);

fn vertex_key(v: Vec3) -> VertexKey {
    let q = (v * VERTEX_WELD_SCALE).round();
    (q.x as i32, q.y as i32, q.z as i32)
}

fn edge_key(a: Vec3, b: Vec3) -> (VertexKey, VertexKey) {
    let (ka, kb) = (vertex_key(a), vertex_key(b));
    if ka <= kb {
        (ka, kb)
    } else {
        (kb, ka)
    }
}

#[derive(Debug, Clone)]
struct HostTriangle {
    corners: [Vec3; 3],
    areas: AreaMask,
}

/// Area-tagged mesh acting as geometry source and navigation oracle
#[derive(Debug, Default)]
pub struct TaggedMeshHost {
    area_names: Vec<String>,
    meshes: Vec<SourceMesh>,
    triangles: Vec<HostTriangle>,
    neighbours: Vec<Vec<usize>>,
    edges: HashMap<(VertexKey, VertexKey), Vec<usize>>,
}

impl TaggedMeshHost {
    /// Creates an empty host with the given area classes, in bit order
    pub fn new<I, S>(area_names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let area_names: Vec<String> = area_names.into_iter().map(Into::into).collect();
        if area_names.len() > MAX_AREA_CLASSES {
            return Err(Error::InvalidConfig(format!(
                "Too many area classes (max {})",
                MAX_AREA_CLASSES
            )));
        }
        Ok(Self {
            area_names,
            ..Default::default()
        })
    }

    /// Builds a host from an OBJ mesh, using its groups as area classes
    pub fn from_tri_mesh(mesh: &TriMesh, layer: u32) -> Result<Self> {
        let mut host = Self::new(mesh.group_names.iter().cloned())?;
        let vertices = (0..mesh.vert_count).map(|i| mesh.vertex(i)).collect();
        let indices = mesh.indices.iter().map(|&i| i as u32).collect();
        host.add_mesh(
            SourceMesh {
                vertices,
                indices,
                layer,
            },
            &mesh.tri_groups,
        )?;
        Ok(host)
    }

    /// Adds a mesh whose triangle `i` belongs to the areas in `tri_areas[i]`
    pub fn add_mesh(&mut self, mesh: SourceMesh, tri_areas: &[AreaMask]) -> Result<()> {
        if tri_areas.len() != mesh.triangle_count() {
            return Err(Error::InvalidMesh(format!(
                "Expected {} area masks, got {}",
                mesh.triangle_count(),
                tri_areas.len()
            )));
        }

        let mut corners = Vec::with_capacity(tri_areas.len());
        for i in 0..mesh.triangle_count() {
            let tri = mesh.triangle(i).ok_or_else(|| {
                Error::InvalidMesh(format!("Triangle {} has an out of range index", i))
            })?;
            corners.push(tri);
        }

        for (tri, &areas) in corners.into_iter().zip(tri_areas) {
            self.push_triangle(tri, areas);
        }
        self.meshes.push(mesh);
        Ok(())
    }

    fn push_triangle(&mut self, corners: [Vec3; 3], areas: AreaMask) {
        let idx = self.triangles.len();
        self.triangles.push(HostTriangle { corners, areas });
        self.neighbours.push(Vec::new());

        for e in 0..3 {
            let key = edge_key(corners[e], corners[(e + 1) % 3]);
            let shared = self.edges.entry(key).or_default();
            for &other in shared.iter() {
                self.neighbours[other].push(idx);
                self.neighbours[idx].push(other);
            }
            shared.push(idx);
        }
    }

    /// Number of triangles across all meshes
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Registered area class names, in bit order
    pub fn area_names(&self) -> &[String] {
        &self.area_names
    }

    /// Closest matching triangle and the point on it, within `radius`
    fn nearest_triangle(&self, point: Vec3, radius: f32, mask: AreaMask) -> Option<(usize, Vec3)> {
        let mut best: Option<(usize, Vec3, f32)> = None;
        for (idx, tri) in self.triangles.iter().enumerate() {
            if tri.areas & mask == 0 {
                continue;
            }
            let [a, b, c] = tri.corners;
            let closest = closest_point_on_triangle(point, a, b, c);
            let d = closest.distance_squared(point);
            if best.map_or(true, |(_, _, best_d)| d < best_d) {
                best = Some((idx, closest, d));
            }
        }

        best.filter(|&(_, _, d)| d <= radius * radius)
            .map(|(idx, p, _)| (idx, p))
    }

    /// Breadth-first search over edge-adjacent triangles in `mask`
    fn connected(&self, from: usize, to: usize, mask: AreaMask) -> bool {
        if from == to {
            return true;
        }
        let mut visited = vec![false; self.triangles.len()];
        let mut queue = VecDeque::new();
        visited[from] = true;
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            for &next in &self.neighbours[current] {
                if visited[next] || self.triangles[next].areas & mask == 0 {
                    continue;
                }
                if next == to {
                    return true;
                }
                visited[next] = true;
                queue.push_back(next);
            }
        }

        false
    }
}

impl GeometrySource for TaggedMeshHost {
    fn collect_meshes(&self, bounds: &Aabb, layer_mask: u32) -> Vec<SourceMesh> {
        self.meshes
            .iter()
            .filter(|m| m.in_layer_mask(layer_mask))
            .filter(|m| m.bounds().is_some_and(|b| b.intersects(bounds)))
            .cloned()
            .collect()
    }
}

impl NavigationOracle for TaggedMeshHost {
    fn snap_to_surface(&self, point: Vec3, radius: f32, mask: AreaMask) -> Option<Vec3> {
        self.nearest_triangle(point, radius, mask).map(|(_, p)| p)
    }

    fn path_status(&self, start: Vec3, end: Vec3, mask: AreaMask) -> PathStatus {
        let Some((from, _)) = self.nearest_triangle(start, PATH_ENDPOINT_RADIUS, mask) else {
            return PathStatus::Invalid;
        };
        let Some((to, _)) = self.nearest_triangle(end, PATH_ENDPOINT_RADIUS, mask) else {
            return PathStatus::Invalid;
        };

        if self.connected(from, to, mask) {
            PathStatus::Complete
        } else {
            PathStatus::Partial
        }
    }

    fn area_mask(&self, name: &str) -> Option<AreaMask> {
        self.area_names
            .iter()
            .position(|n| n == name)
            .map(|idx| 1 << idx)
    }
}
