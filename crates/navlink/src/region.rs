//! Region discovery and merging
//!
//! Occupied grid cells are first grouped by flood fill over the same-layer
//! neighbour ring. The resulting regions are then joined pairwise whenever
//! the host reports a complete path between their representative points.

use std::collections::{BTreeMap, VecDeque};

use glam::Vec3;

use crate::context::AnalysisContext;
use crate::grid::{CellGrid, UNASSIGNED_REGION};
use crate::host::{AreaMask, NavigationOracle};

/// A set of grid cells sharing a region id
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Region id, also stored in every member cell
    pub id: i32,
    /// Index of the first discovered cell
    pub representative: usize,
    /// Sample position of the representative cell
    pub anchor: Vec3,
    /// Indices of all member cells, representative first
    pub members: Vec<usize>,
}

/// Active regions keyed by id, iterated in discovery order
#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    regions: BTreeMap<i32, Region>,
}

impl RegionMap {
    /// Number of active regions
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns true if there are no regions
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region with the given id
    pub fn get(&self, id: i32) -> Option<&Region> {
        self.regions.get(&id)
    }

    /// Active region ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.regions.keys().copied()
    }

    /// Active regions in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    /// Sum of member counts over all active regions
    pub fn total_members(&self) -> usize {
        self.regions.values().map(|r| r.members.len()).sum()
    }

    fn insert(&mut self, region: Region) {
        self.regions.insert(region.id, region);
    }
}

/// Groups occupied cells into regions by breadth-first flood fill.
///
/// Cells are visited in row-major order; each unassigned occupied cell
/// seeds a new region with the next id, starting at 1.
pub fn cluster_regions(grid: &mut CellGrid) -> RegionMap {
    let mut regions = RegionMap::default();
    let mut queue = VecDeque::new();
    let mut neighbours = Vec::with_capacity(8);
    let mut next_id = 0;

    for seed in 0..grid.len() {
        let cell = grid.cell(seed);
        let Some(anchor) = cell.position else {
            continue;
        };
        if cell.region_id != UNASSIGNED_REGION {
            continue;
        }

        next_id += 1;
        grid.cell_mut(seed).region_id = next_id;
        let mut members = vec![seed];

        queue.clear();
        queue.push_back(seed);
        while let Some(current) = queue.pop_front() {
            neighbours.clear();
            neighbours.extend(grid.neighbours(current));

            for &n in &neighbours {
                let cell = grid.cell_mut(n);
                if cell.has_point() && cell.region_id == UNASSIGNED_REGION {
                    cell.region_id = next_id;
                    members.push(n);
                    queue.push_back(n);
                }
            }
        }

        regions.insert(Region {
            id: next_id,
            representative: seed,
            anchor,
            members,
        });
    }

    log::debug!("flood fill found {} regions", regions.len());
    regions
}

/// Joins regions whose representatives the oracle can connect.
///
/// Every pair of active regions is tested once, earlier id first. On a
/// complete path the later region is absorbed into the earlier one: its
/// cells take the earlier id and its entry is removed, so it is never tested
/// again. Representatives keep their anchor for the whole pass.
///
/// Returns the number of merges performed.
pub fn merge_regions<O: NavigationOracle + ?Sized>(
    grid: &mut CellGrid,
    regions: &mut RegionMap,
    oracle: &O,
    bridge_mask: AreaMask,
    ctx: &mut AnalysisContext,
) -> usize {
    let ids: Vec<i32> = regions.ids().collect();
    let mut merges = 0;

    for (i, &keep_id) in ids.iter().enumerate() {
        let Some(keep_anchor) = regions.get(keep_id).map(|r| r.anchor) else {
            continue;
        };

        for &other_id in &ids[i + 1..] {
            let Some(other_anchor) = regions.get(other_id).map(|r| r.anchor) else {
                continue;
            };

            ctx.stats.path_queries += 1;
            if !oracle
                .path_status(keep_anchor, other_anchor, bridge_mask)
                .is_complete()
            {
                continue;
            }

            let Some(absorbed) = regions.regions.remove(&other_id) else {
                continue;
            };
            for &member in &absorbed.members {
                grid.cell_mut(member).region_id = keep_id;
            }
            if let Some(keep) = regions.regions.get_mut(&keep_id) {
                keep.members.extend(absorbed.members);
            }
            merges += 1;
            log::debug!("merged region {} into region {}", other_id, keep_id);
        }
    }

    ctx.stats.merges += merges;
    log::debug!(
        "merging left {} of {} regions after {} merges",
        regions.len(),
        ids.len(),
        merges
    );

    merges
}
