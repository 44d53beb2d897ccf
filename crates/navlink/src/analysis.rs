//! Full link analysis run
//!
//! Chains the stages: collect triangles, sample the surface, bin samples
//! into the grid, flood-fill regions, merge reachable regions and pick link
//! endpoints. All intermediate state belongs to the returned [`AnalysisRun`].

use glam::Vec3;
use navlink_common::{Result, Triangle};

use crate::config::AnalysisConfig;
use crate::context::{AnalysisContext, TimerCategory};
use crate::grid::CellGrid;
use crate::halton::HaltonTable;
use crate::host::{AreaMasks, GeometrySource, NavigationOracle};
use crate::link::{classify_regions, select_links, ConnectionInfo, LinkCandidate};
use crate::region::{cluster_regions, merge_regions, RegionMap};
use crate::sampler::{collect_triangles, sample_points};

/// Runs the link analysis with a fixed configuration and point table
#[derive(Debug)]
pub struct LinkAnalysis<'t> {
    config: AnalysisConfig,
    table: &'t HaltonTable,
}

/// Everything produced by one analysis run
#[derive(Debug)]
pub struct AnalysisRun {
    /// Collected triangles with their accepted samples
    pub triangles: Vec<Triangle>,
    /// All accepted samples in generation order
    pub points: Vec<Vec3>,
    /// The grid with region and link flags filled in
    pub grid: CellGrid,
    /// Regions left after merging
    pub regions: RegionMap,
    /// Ids of regions touching both traversal classes
    pub qualifying: Vec<i32>,
    /// Selected links, one per qualifying region at most
    pub links: Vec<LinkCandidate>,
    /// Timers and counters of the run
    pub context: AnalysisContext,
}

impl AnalysisRun {
    /// Link endpoints as parallel position lists
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo::from_links(&self.links)
    }
}

impl<'t> LinkAnalysis<'t> {
    /// Creates an analysis sampling with points from `table`
    pub fn new(config: AnalysisConfig, table: &'t HaltonTable) -> Self {
        Self { config, table }
    }

    /// Gets a reference to the configuration
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Runs every stage against the host and returns the results.
    ///
    /// Fails on invalid configuration or an area class the oracle does not
    /// know. Oracle misses are not errors; they only reduce the output.
    pub fn run<S, O>(&self, source: &S, oracle: &O) -> Result<AnalysisRun>
    where
        S: GeometrySource + ?Sized,
        O: NavigationOracle + ?Sized,
    {
        let config = &self.config;
        config.validate()?;
        let masks = AreaMasks::resolve(
            oracle,
            &config.bridge_area,
            &config.class_one_area,
            &config.class_two_area,
        )?;

        let mut ctx = AnalysisContext::new();
        ctx.start_timer(TimerCategory::Total);

        let mut triangles = {
            let mut t = ctx.timer(TimerCategory::Collect);
            let triangles = collect_triangles(source, &config.bounds, config.layer_mask)?;
            t.context().stats.triangles = triangles.len();
            triangles
        };

        let points = {
            let mut t = ctx.timer(TimerCategory::Sample);
            let mut source_points = self.table.source();
            sample_points(
                &mut triangles,
                &mut source_points,
                oracle,
                config,
                masks.bridge,
                t.context(),
            )
        };

        let mut grid = {
            let mut t = ctx.timer(TimerCategory::Grid);
            let mut grid = CellGrid::new(config.bounds, config.cell_size)?;
            t.context().stats.occupied_cells = grid.insert_points(&points);
            grid
        };

        let mut regions = {
            let mut t = ctx.timer(TimerCategory::Cluster);
            let regions = cluster_regions(&mut grid);
            t.context().stats.initial_regions = regions.len();
            regions
        };

        {
            let mut t = ctx.timer(TimerCategory::Merge);
            merge_regions(&mut grid, &mut regions, oracle, masks.bridge, t.context());
        }

        let (qualifying, links) = {
            let mut t = ctx.timer(TimerCategory::Link);
            let qualifying =
                classify_regions(&mut grid, &regions, oracle, &masks, config, t.context());
            let links = select_links(
                &mut grid,
                &regions,
                &qualifying,
                oracle,
                &masks,
                config,
                t.context(),
            );
            (qualifying, links)
        };

        ctx.stop_timer(TimerCategory::Total);
        ctx.log_summary();

        Ok(AnalysisRun {
            triangles,
            points,
            grid,
            regions,
            qualifying,
            links,
            context: ctx,
        })
    }
}
