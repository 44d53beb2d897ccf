//! Mesh utilities for area-tagged triangle meshes

use crate::{Aabb, Result};
use glam::Vec3;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Maximum number of distinct group names a mesh may carry
pub const MAX_MESH_GROUPS: usize = 32;

/// A simple triangle mesh whose faces are tagged with OBJ groups
#[derive(Debug, Clone, Default)]
pub struct TriMesh {
    /// The vertices of the mesh as a flat array of [x, y, z] coordinates
    pub vertices: Vec<f32>,
    /// The indices of the mesh, 3 per triangle
    pub indices: Vec<i32>,
    /// The number of vertices in the mesh
    pub vert_count: usize,
    /// The number of triangles in the mesh
    pub tri_count: usize,
    /// Distinct group names in order of first appearance
    pub group_names: Vec<String>,
    /// Per triangle bitmask of indices into `group_names`
    pub tri_groups: Vec<u32>,
    /// Group mask applied to faces that follow
    current_groups: u32,
}

impl TriMesh {
    /// Creates a new empty triangle mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a mesh from an OBJ file
    pub fn from_obj<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut mesh = Self::new();

        for line in reader.lines() {
            let line = line?;
            mesh.parse_obj_line(&line)?;
        }

        mesh.validate()?;
        Ok(mesh)
    }

    /// Parses OBJ content from a string
    ///
    /// Group statements (`g Jump BakeLink`) tag every following face with
    /// each named group; a face can belong to several groups.
    ///
    /// # Example
    ///
    /// ```
    /// use navlink_common::TriMesh;
    ///
    /// let obj_content = r#"
    /// v 0.0 0.0 0.0
    /// v 1.0 0.0 0.0
    /// v 0.5 0.0 1.0
    /// g Walkable
    /// f 1 2 3
    /// "#;
    ///
    /// let mesh = TriMesh::from_obj_str(obj_content).unwrap();
    /// assert_eq!(mesh.vert_count, 3);
    /// assert_eq!(mesh.tri_count, 1);
    /// assert_eq!(mesh.group_names, vec!["Walkable".to_string()]);
    /// ```
    pub fn from_obj_str(content: &str) -> Result<Self> {
        let mut mesh = Self::new();

        for line in content.lines() {
            mesh.parse_obj_line(line)?;
        }

        mesh.validate()?;
        Ok(mesh)
    }

    /// Parses a single line from an OBJ file
    fn parse_obj_line(&mut self, line: &str) -> Result<()> {
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            Some("v") => {
                for axis in ["x", "y", "z"] {
                    let value = tokens
                        .next()
                        .ok_or_else(|| {
                            crate::Error::InvalidMesh(format!(
                                "Invalid vertex: missing {} coordinate",
                                axis
                            ))
                        })?
                        .parse::<f32>()
                        .map_err(|_| {
                            crate::Error::InvalidMesh(format!(
                                "Invalid vertex: {} coordinate is not a number",
                                axis
                            ))
                        })?;
                    self.vertices.push(value);
                }
                self.vert_count += 1;
            }
            Some("g") => {
                self.current_groups = 0;
                for name in tokens {
                    let bit = self.group_index(name)?;
                    self.current_groups |= 1 << bit;
                }
            }
            Some("f") => {
                let mut face_indices = Vec::new();

                for token in tokens {
                    let index_str = token.split('/').next().ok_or_else(|| {
                        crate::Error::InvalidMesh("Invalid face: missing vertex index".to_string())
                    })?;

                    let index = index_str.parse::<i32>().map_err(|_| {
                        crate::Error::InvalidMesh(
                            "Invalid face: vertex index is not a number".to_string(),
                        )
                    })?;
                    if index < 1 {
                        return Err(crate::Error::InvalidMesh(format!(
                            "Invalid face: unsupported vertex index {}",
                            index
                        )));
                    }

                    // OBJ indices are 1-based
                    face_indices.push(index - 1);
                }

                if face_indices.len() < 3 {
                    return Err(crate::Error::InvalidMesh(
                        "Invalid face: less than 3 vertices".to_string(),
                    ));
                }

                // Fan triangulation for polygons
                for i in 1..(face_indices.len() - 1) {
                    self.indices.push(face_indices[0]);
                    self.indices.push(face_indices[i]);
                    self.indices.push(face_indices[i + 1]);
                    self.tri_groups.push(self.current_groups);
                    self.tri_count += 1;
                }
            }
            _ => {
                // Skip normals, texture coordinates, comments, etc.
            }
        }

        Ok(())
    }

    /// Returns the bit index of a group name, registering it if new
    fn group_index(&mut self, name: &str) -> Result<usize> {
        if let Some(idx) = self.group_names.iter().position(|n| n == name) {
            return Ok(idx);
        }
        if self.group_names.len() >= MAX_MESH_GROUPS {
            return Err(crate::Error::InvalidMesh(format!(
                "Too many groups (max {})",
                MAX_MESH_GROUPS
            )));
        }
        self.group_names.push(name.to_string());
        Ok(self.group_names.len() - 1)
    }

    /// Checks that every face index refers to an existing vertex
    fn validate(&self) -> Result<()> {
        if let Some(&bad) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.vert_count)
        {
            return Err(crate::Error::InvalidMesh(format!(
                "Face index {} out of range ({} vertices)",
                bad + 1,
                self.vert_count
            )));
        }
        Ok(())
    }

    /// Returns vertex `i` as a vector
    #[inline]
    pub fn vertex(&self, i: usize) -> Vec3 {
        Vec3::new(
            self.vertices[i * 3],
            self.vertices[i * 3 + 1],
            self.vertices[i * 3 + 2],
        )
    }

    /// Calculates the axis-aligned bounding box of the mesh
    pub fn calculate_bounds(&self) -> Aabb {
        let verts: Vec<Vec3> = (0..self.vert_count).map(|i| self.vertex(i)).collect();
        Aabb::from_points(&verts).unwrap_or_default()
    }
}
