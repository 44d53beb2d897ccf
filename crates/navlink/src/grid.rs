//! Uniform 3D grid for binning surface samples
//!
//! Each cell holds at most one sample. Adjacency is the ring of eight
//! horizontal neighbours in the same layer; cells stacked vertically are
//! never adjacent, so separate floors only join through the oracle.

use glam::Vec3;
use navlink_common::{Aabb, Error, Result};

/// Region id of a cell not yet assigned to a region
pub const UNASSIGNED_REGION: i32 = -1;

/// Upper limit on the number of cells in one grid
pub const MAX_GRID_CELLS: usize = 1 << 26;

/// Horizontal (dx, dz) offsets of the eight same-layer neighbours
const NEIGHBOUR_OFFSETS: [(isize, isize); 8] = [
    (1, 1),
    (1, 0),
    (1, -1),
    (0, 1),
    (0, -1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// A single grid cell
#[derive(Debug, Clone)]
pub struct GridCell {
    /// Lattice coordinates (x, y, z)
    pub coord: [usize; 3],
    /// World-space extent of the cell
    pub bounds: Aabb,
    /// The sample kept for this cell
    pub position: Option<Vec3>,
    /// Region the cell belongs to, or [`UNASSIGNED_REGION`]
    pub region_id: i32,
    /// Within query range of the first traversal class
    pub in_class_one: bool,
    /// Within query range of the second traversal class
    pub in_class_two: bool,
    /// Member of a region touching both classes
    pub in_connected_region: bool,
    /// Chosen as a link endpoint
    pub is_link_point: bool,
    /// Index of the cell at the other end of the link
    pub peer: Option<usize>,
}

impl GridCell {
    fn new(coord: [usize; 3], bounds: Aabb) -> Self {
        Self {
            coord,
            bounds,
            position: None,
            region_id: UNASSIGNED_REGION,
            in_class_one: false,
            in_class_two: false,
            in_connected_region: false,
            is_link_point: false,
            peer: None,
        }
    }

    /// Returns true if the cell holds a sample
    #[inline]
    pub fn has_point(&self) -> bool {
        self.position.is_some()
    }
}

/// Lattice of cells covering a bounding volume
#[derive(Debug, Clone)]
pub struct CellGrid {
    bounds: Aabb,
    cell_size: Vec3,
    dims: [usize; 3],
    cells: Vec<GridCell>,
}

impl CellGrid {
    /// Allocates a grid of `ceil(size / cell_size)` cells per axis
    pub fn new(bounds: Aabb, cell_size: Vec3) -> Result<Self> {
        if !(cell_size.min_element() > 0.0) || !cell_size.is_finite() {
            return Err(Error::InvalidConfig("Invalid cell size".to_string()));
        }
        if !bounds.is_valid() || !bounds.min.is_finite() || !bounds.max.is_finite() {
            return Err(Error::InvalidConfig("Invalid grid bounds".to_string()));
        }

        let counts = (bounds.size() / cell_size).ceil();
        let dims = [
            (counts.x as usize).max(1),
            (counts.y as usize).max(1),
            (counts.z as usize).max(1),
        ];
        let total = dims[0]
            .checked_mul(dims[1])
            .and_then(|n| n.checked_mul(dims[2]))
            .filter(|&n| n <= MAX_GRID_CELLS)
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "Grid of {}x{}x{} cells is too large",
                    dims[0], dims[1], dims[2]
                ))
            })?;

        let mut cells = Vec::with_capacity(total);
        for x in 0..dims[0] {
            for y in 0..dims[1] {
                for z in 0..dims[2] {
                    let min = bounds.min + cell_size * Vec3::new(x as f32, y as f32, z as f32);
                    cells.push(GridCell::new([x, y, z], Aabb::new(min, min + cell_size)));
                }
            }
        }

        Ok(Self {
            bounds,
            cell_size,
            dims,
            cells,
        })
    }

    /// Number of cells along x, y and z
    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Extents of one cell
    #[inline]
    pub fn cell_size(&self) -> Vec3 {
        self.cell_size
    }

    /// Volume covered by the grid
    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Total number of cells
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false; a grid has at least one cell
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Row-major index of a lattice coordinate
    #[inline]
    pub fn index_of(&self, coord: [usize; 3]) -> usize {
        (coord[0] * self.dims[1] + coord[1]) * self.dims[2] + coord[2]
    }

    /// All cells in row-major order
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Cell at `index`
    #[inline]
    pub fn cell(&self, index: usize) -> &GridCell {
        &self.cells[index]
    }

    /// Mutable cell at `index`
    #[inline]
    pub fn cell_mut(&mut self, index: usize) -> &mut GridCell {
        &mut self.cells[index]
    }

    /// Lattice coordinate of the cell containing `point`.
    ///
    /// Points on the maximum faces of the grid volume fall into the last
    /// cell of that axis; points outside the volume have no cell.
    pub fn cell_coord(&self, point: Vec3) -> Option<[usize; 3]> {
        if !point.is_finite() || !self.bounds.contains_point(point) {
            return None;
        }
        let local = ((point - self.bounds.min) / self.cell_size).floor();
        let mut coord = [0usize; 3];
        for (axis, c) in coord.iter_mut().enumerate() {
            let value = local[axis];
            if value < 0.0 {
                return None;
            }
            *c = (value as usize).min(self.dims[axis] - 1);
        }
        Some(coord)
    }

    /// Bins samples into cells; the first sample to reach a cell keeps it.
    ///
    /// Returns the number of cells that became occupied.
    pub fn insert_points(&mut self, points: &[Vec3]) -> usize {
        let mut placed = 0;
        let mut outside = 0;

        for &p in points {
            let Some(coord) = self.cell_coord(p) else {
                outside += 1;
                continue;
            };
            let idx = self.index_of(coord);
            let cell = &mut self.cells[idx];
            if cell.position.is_none() {
                cell.position = Some(p);
                placed += 1;
            }
        }

        log::debug!(
            "binned {} samples into {} cells ({} outside grid, {} duplicates)",
            points.len(),
            placed,
            outside,
            points.len() - placed - outside
        );

        placed
    }

    /// Number of cells holding a sample
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.has_point()).count()
    }

    /// Indices of the same-layer neighbours of a cell, bounds checked
    pub fn neighbours(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let [x, y, z] = self.cells[index].coord;
        NEIGHBOUR_OFFSETS.iter().filter_map(move |&(dx, dz)| {
            let nx = x.checked_add_signed(dx).filter(|&v| v < self.dims[0])?;
            let nz = z.checked_add_signed(dz).filter(|&v| v < self.dims[2])?;
            Some(self.index_of([nx, y, nz]))
        })
    }
}
