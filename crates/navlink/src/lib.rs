//! Link point analysis for navigation surfaces
//!
//! Samples a walkable surface, groups the samples into regions that the
//! host navmesh can connect, and proposes one link endpoint pair per region
//! that touches two different traversal classes. The host navmesh is only
//! consulted through the [`GeometrySource`] and [`NavigationOracle`] traits.

mod analysis;
mod config;
mod context;
mod grid;
mod halton;
mod host;
mod link;
mod mesh_host;
mod region;
mod sampler;


pub use analysis::{AnalysisRun, LinkAnalysis};
pub use config::AnalysisConfig;
pub use context::{AnalysisContext, AnalysisStats, TimerCategory, TimerEntry, TimerGuard};
pub use grid::{CellGrid, GridCell, MAX_GRID_CELLS, UNASSIGNED_REGION};
pub use halton::{
    HaltonSequence, HaltonTable, PointSource, DEFAULT_TABLE_LEN, HALTON_TABLE_MAGIC,
    HALTON_TABLE_VERSION,
};
pub use host::{AreaMask, AreaMasks, GeometrySource, NavigationOracle, PathStatus, SourceMesh};
pub use link::{classify_regions, select_links, ConnectionInfo, LinkCandidate};
pub use mesh_host::{TaggedMeshHost, MAX_AREA_CLASSES, PATH_ENDPOINT_RADIUS};
pub use region::{cluster_regions, merge_regions, Region, RegionMap};
pub use sampler::{collect_triangles, sample_count, sample_points, LARGE_TRIANGLE_SAMPLES};
