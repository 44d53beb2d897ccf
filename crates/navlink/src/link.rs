//! Dual-class link point selection
//!
//! A region qualifies when some of its cells lie on the first traversal
//! class and some on the second. In each qualifying region the closest
//! non-degenerate pair of such cells becomes a link candidate.

use glam::Vec3;

use crate::config::AnalysisConfig;
use crate::context::AnalysisContext;
use crate::grid::CellGrid;
use crate::host::{AreaMasks, NavigationOracle};
use crate::region::RegionMap;

/// A chosen pair of link endpoints
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkCandidate {
    /// Region both endpoints belong to
    pub region_id: i32,
    /// Grid index of the class-one endpoint
    pub cell_one: usize,
    /// Grid index of the class-two endpoint
    pub cell_two: usize,
    /// Class-one endpoint after the final snap
    pub class_one: Vec3,
    /// Class-two endpoint after the final snap
    pub class_two: Vec3,
}

impl LinkCandidate {
    /// Distance between the two endpoints
    pub fn distance(&self) -> f32 {
        self.class_one.distance(self.class_two)
    }
}

/// Link endpoints as two parallel position lists
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionInfo {
    /// Class-one endpoint of each link
    pub region_one_pos: Vec<Vec3>,
    /// Class-two endpoint of each link
    pub region_two_pos: Vec<Vec3>,
}

impl ConnectionInfo {
    /// Builds the endpoint lists from selected links, in order
    pub fn from_links(links: &[LinkCandidate]) -> Self {
        let (region_one_pos, region_two_pos) =
            links.iter().map(|l| (l.class_one, l.class_two)).unzip();
        Self {
            region_one_pos,
            region_two_pos,
        }
    }

    /// Number of links
    pub fn len(&self) -> usize {
        self.region_one_pos.len()
    }

    /// Returns true if there are no links
    pub fn is_empty(&self) -> bool {
        self.region_one_pos.is_empty()
    }

    /// Endpoint pairs in order
    pub fn pairs(&self) -> impl Iterator<Item = (Vec3, Vec3)> + '_ {
        self.region_one_pos
            .iter()
            .copied()
            .zip(self.region_two_pos.iter().copied())
    }
}

/// Queries every region member for class membership.
///
/// Sets the class flags of each member cell and marks all members of
/// qualifying regions as connected. Returns the qualifying region ids in
/// ascending order.
pub fn classify_regions<O: NavigationOracle + ?Sized>(
    grid: &mut CellGrid,
    regions: &RegionMap,
    oracle: &O,
    masks: &AreaMasks,
    config: &AnalysisConfig,
    ctx: &mut AnalysisContext,
) -> Vec<i32> {
    let radius = config.class_query_radius;
    let mut qualifying = Vec::new();

    for region in regions.iter() {
        let mut has_one = false;
        let mut has_two = false;

        for &member in &region.members {
            let cell = grid.cell_mut(member);
            let Some(pos) = cell.position else {
                continue;
            };
            cell.in_class_one = oracle.snap_to_surface(pos, radius, masks.class_one).is_some();
            cell.in_class_two = oracle.snap_to_surface(pos, radius, masks.class_two).is_some();
            ctx.stats.snap_queries += 2;

            has_one |= cell.in_class_one;
            has_two |= cell.in_class_two;
        }

        if has_one && has_two {
            for &member in &region.members {
                grid.cell_mut(member).in_connected_region = true;
            }
            qualifying.push(region.id);
        }
    }

    ctx.stats.qualifying_regions += qualifying.len();
    log::debug!(
        "{} of {} regions touch both classes",
        qualifying.len(),
        regions.len()
    );

    qualifying
}

/// Closest class-one/class-two member pair further apart than `min_dist_sqr`.
///
/// Ties keep the first pair found in member order.
fn closest_pair(
    grid: &CellGrid,
    members: &[usize],
    min_dist_sqr: f32,
) -> Option<(usize, usize)> {
    let mut best: Option<(f32, usize, usize)> = None;

    for &one in members.iter().filter(|&&m| grid.cell(m).in_class_one) {
        let Some(p1) = grid.cell(one).position else {
            continue;
        };
        for &two in members.iter().filter(|&&m| grid.cell(m).in_class_two) {
            let Some(p2) = grid.cell(two).position else {
                continue;
            };
            let d2 = p1.distance_squared(p2);
            if d2 > min_dist_sqr && best.map_or(true, |(b, _, _)| d2 < b) {
                best = Some((d2, one, two));
            }
        }
    }

    best.map(|(_, one, two)| (one, two))
}

/// Chooses one link per qualifying region.
///
/// Both endpoints are flagged as link points and refer to each other as
/// peers. Final positions are snapped onto their own class with the link
/// snap radius, keeping the sample position when the snap fails. Regions
/// without a usable pair are skipped.
pub fn select_links<O: NavigationOracle + ?Sized>(
    grid: &mut CellGrid,
    regions: &RegionMap,
    qualifying: &[i32],
    oracle: &O,
    masks: &AreaMasks,
    config: &AnalysisConfig,
    ctx: &mut AnalysisContext,
) -> Vec<LinkCandidate> {
    let mut links = Vec::with_capacity(qualifying.len());

    for &id in qualifying {
        let Some(region) = regions.get(id) else {
            continue;
        };
        let Some((cell_one, cell_two)) =
            closest_pair(grid, &region.members, config.min_link_dist_sqr)
        else {
            log::warn!(
                "region {} touches both classes but has no pair further apart than {}",
                id,
                config.min_link_dist_sqr.sqrt()
            );
            continue;
        };

        let (Some(raw_one), Some(raw_two)) =
            (grid.cell(cell_one).position, grid.cell(cell_two).position)
        else {
            continue;
        };

        {
            let cell = grid.cell_mut(cell_one);
            cell.is_link_point = true;
            cell.peer = Some(cell_two);
        }
        {
            let cell = grid.cell_mut(cell_two);
            cell.is_link_point = true;
            cell.peer = Some(cell_one);
        }

        let radius = config.link_snap_radius;
        let class_one = oracle
            .snap_to_surface(raw_one, radius, masks.class_one)
            .unwrap_or(raw_one);
        let class_two = oracle
            .snap_to_surface(raw_two, radius, masks.class_two)
            .unwrap_or(raw_two);
        ctx.stats.snap_queries += 2;

        log::debug!(
            "region {}: link {:?} -> {:?}",
            id,
            class_one,
            class_two
        );

        links.push(LinkCandidate {
            region_id: id,
            cell_one,
            cell_two,
            class_one,
            class_two,
        });
    }

    ctx.stats.links += links.len();
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{AreaMask, PathStatus};
    use crate::region::cluster_regions;
    use navlink_common::Aabb;

    const ONE: AreaMask = 2;
    const TWO: AreaMask = 4;

    fn masks() -> AreaMasks {
        AreaMasks {
            bridge: 1,
            class_one: ONE,
            class_two: TWO,
        }
    }

    /// Class one covers x <= `split`, class two covers x >= `split`.
    ///
    /// Snaps lift points by `lift` so the final snap is observable, and only
    /// answer queries up to `max_radius`.
    struct SplitOracle {
        split: f32,
        lift: f32,
        max_radius: f32,
    }

    impl SplitOracle {
        fn new(split: f32) -> Self {
            Self {
                split,
                lift: 0.25,
                max_radius: f32::MAX,
            }
        }
    }

    impl NavigationOracle for SplitOracle {
        fn snap_to_surface(&self, point: Vec3, radius: f32, mask: AreaMask) -> Option<Vec3> {
            if radius > self.max_radius {
                return None;
            }
            let inside = match mask {
                ONE => point.x <= self.split,
                TWO => point.x >= self.split,
                _ => false,
            };
            inside.then(|| point + Vec3::Y * self.lift)
        }

        fn path_status(&self, _start: Vec3, _end: Vec3, _mask: AreaMask) -> PathStatus {
            PathStatus::Partial
        }

        fn area_mask(&self, _name: &str) -> Option<AreaMask> {
            None
        }
    }

    /// 8 x 1 x 4 grid of unit cells
    fn grid_with(points: &[Vec3]) -> CellGrid {
        let mut grid = CellGrid::new(
            Aabb::new(Vec3::ZERO, Vec3::new(8.0, 2.0, 4.0)),
            Vec3::new(1.0, 2.0, 1.0),
        )
        .unwrap();
        grid.insert_points(points);
        grid
    }

    fn row(z: usize, xs: std::ops::Range<usize>) -> Vec<Vec3> {
        xs.map(|x| Vec3::new(x as f32 + 0.5, 0.0, z as f32 + 0.5))
            .collect()
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig::new()
    }

    #[test]
    fn test_classify_flags_and_qualifying() {
        // Region 1 spans both classes, region 2 only class two
        let mut points = row(0, 0..8);
        points.extend(row(3, 4..8));
        let mut grid = grid_with(&points);
        let regions = cluster_regions(&mut grid);
        assert_eq!(regions.len(), 2);

        let oracle = SplitOracle::new(2.0);
        let mut ctx = AnalysisContext::new();
        let qualifying = classify_regions(&mut grid, &regions, &oracle, &masks(), &config(), &mut ctx);

        assert_eq!(qualifying, vec![1]);
        assert_eq!(ctx.stats.qualifying_regions, 1);
        assert_eq!(ctx.stats.snap_queries, 2 * grid.occupied_count());

        for cell in grid.cells().iter().filter(|c| c.has_point()) {
            let x = cell.position.unwrap().x;
            assert_eq!(cell.in_class_one, x <= 2.0);
            assert_eq!(cell.in_class_two, x >= 2.0);
            assert_eq!(cell.in_connected_region, cell.region_id == 1);
        }
    }

    #[test]
    fn test_select_closest_pair() {
        let mut grid = grid_with(&row(0, 0..8));
        let regions = cluster_regions(&mut grid);
        let oracle = SplitOracle::new(2.0);
        let mut ctx = AnalysisContext::new();
        let qualifying = classify_regions(&mut grid, &regions, &oracle, &masks(), &config(), &mut ctx);
        let links = select_links(
            &mut grid,
            &regions,
            &qualifying,
            &oracle,
            &masks(),
            &config(),
            &mut ctx,
        );

        assert_eq!(links.len(), 1);
        let link = &links[0];
        assert_eq!(link.region_id, 1);
        assert_eq!(grid.cell(link.cell_one).coord, [1, 0, 0]);
        assert_eq!(grid.cell(link.cell_two).coord, [2, 0, 0]);
        assert_eq!(link.class_one, Vec3::new(1.5, 0.25, 0.5));
        assert_eq!(link.class_two, Vec3::new(2.5, 0.25, 0.5));
        assert!((link.distance() - 1.0).abs() < 1e-6);

        let one = grid.cell(link.cell_one);
        let two = grid.cell(link.cell_two);
        assert!(one.is_link_point && two.is_link_point);
        assert_eq!(one.peer, Some(link.cell_two));
        assert_eq!(two.peer, Some(link.cell_one));
        assert_eq!(
            grid.cells().iter().filter(|c| c.is_link_point).count(),
            2
        );
        assert_eq!(ctx.stats.links, 1);
    }

    #[test]
    fn test_selected_pair_is_minimal() {
        // Two rows joined into one region, with an irregular class split
        let mut points = row(0, 0..8);
        points.extend(row(1, 3..8));
        let mut grid = grid_with(&points);
        let regions = cluster_regions(&mut grid);
        assert_eq!(regions.len(), 1);

        let oracle = SplitOracle::new(3.7);
        let mut ctx = AnalysisContext::new();
        let cfg = config();
        let qualifying = classify_regions(&mut grid, &regions, &oracle, &masks(), &cfg, &mut ctx);
        let links = select_links(&mut grid, &regions, &qualifying, &oracle, &masks(), &cfg, &mut ctx);
        assert_eq!(links.len(), 1);

        let link = &links[0];
        let chosen = grid
            .cell(link.cell_one)
            .position
            .unwrap()
            .distance_squared(grid.cell(link.cell_two).position.unwrap());

        let region = regions.get(link.region_id).unwrap();
        assert!(region.members.contains(&link.cell_one));
        assert!(region.members.contains(&link.cell_two));
        assert!(grid.cell(link.cell_one).in_class_one);
        assert!(grid.cell(link.cell_two).in_class_two);
        assert!(chosen > cfg.min_link_dist_sqr);

        for &a in region.members.iter().filter(|&&m| grid.cell(m).in_class_one) {
            for &b in region.members.iter().filter(|&&m| grid.cell(m).in_class_two) {
                let d2 = grid
                    .cell(a)
                    .position
                    .unwrap()
                    .distance_squared(grid.cell(b).position.unwrap());
                if d2 > cfg.min_link_dist_sqr {
                    assert!(chosen <= d2);
                }
            }
        }
    }

    #[test]
    fn test_degenerate_pairs_rejected() {
        // A single cell in both classes pairs only with itself
        let mut grid = grid_with(&[Vec3::new(2.0, 0.0, 0.5)]);
        let regions = cluster_regions(&mut grid);
        let oracle = SplitOracle::new(2.0);
        let mut ctx = AnalysisContext::new();
        let qualifying = classify_regions(&mut grid, &regions, &oracle, &masks(), &config(), &mut ctx);
        assert_eq!(qualifying, vec![1]);

        let links = select_links(&mut grid, &regions, &qualifying, &oracle, &masks(), &config(), &mut ctx);
        assert!(links.is_empty());
        assert!(grid.cells().iter().all(|c| !c.is_link_point && c.peer.is_none()));
    }

    #[test]
    fn test_pairs_within_epsilon_rejected() {
        let mut grid = grid_with(&row(0, 0..8));
        let regions = cluster_regions(&mut grid);
        let oracle = SplitOracle::new(2.0);
        let mut cfg = config();
        cfg.min_link_dist_sqr = 100.0;
        let mut ctx = AnalysisContext::new();
        let qualifying = classify_regions(&mut grid, &regions, &oracle, &masks(), &cfg, &mut ctx);
        let links = select_links(&mut grid, &regions, &qualifying, &oracle, &masks(), &cfg, &mut ctx);
        assert!(links.is_empty());
    }

    #[test]
    fn test_failed_final_snap_keeps_raw_position() {
        let mut grid = grid_with(&row(0, 0..8));
        let regions = cluster_regions(&mut grid);
        let mut oracle = SplitOracle::new(2.0);
        oracle.max_radius = 1.0;
        let mut ctx = AnalysisContext::new();
        let qualifying = classify_regions(&mut grid, &regions, &oracle, &masks(), &config(), &mut ctx);
        let links = select_links(&mut grid, &regions, &qualifying, &oracle, &masks(), &config(), &mut ctx);

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].class_one, Vec3::new(1.5, 0.0, 0.5));
        assert_eq!(links[0].class_two, Vec3::new(2.5, 0.0, 0.5));
    }

    #[test]
    fn test_connection_info() {
        let links = vec![
            LinkCandidate {
                region_id: 1,
                cell_one: 0,
                cell_two: 1,
                class_one: Vec3::ZERO,
                class_two: Vec3::X,
            },
            LinkCandidate {
                region_id: 3,
                cell_one: 5,
                cell_two: 9,
                class_one: Vec3::Y,
                class_two: Vec3::Z,
            },
        ];
        let info = ConnectionInfo::from_links(&links);
        assert_eq!(info.len(), 2);
        assert_eq!(info.region_one_pos, vec![Vec3::ZERO, Vec3::Y]);
        assert_eq!(info.region_two_pos, vec![Vec3::X, Vec3::Z]);
        assert_eq!(info.pairs().nth(1), Some((Vec3::Y, Vec3::Z)));
        assert!(ConnectionInfo::from_links(&[]).is_empty());
    }
}
