//! Configuration for the link point analysis

use glam::Vec3;
use navlink_common::{Aabb, Error, Result};

/// Configuration parameters for one analysis run
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalysisConfig {
    /// The sampling volume
    pub bounds: Aabb,
    /// Which source mesh layers to collect
    pub layer_mask: u32,

    /// The maximum slope in degrees a triangle may have to be sampled
    pub max_slope_angle: f32,
    /// Surface area covered by one sample attempt
    pub area_per_sample: f32,
    /// Extents of one grid cell
    pub cell_size: Vec3,

    /// Search radius when snapping samples onto the bridging area
    pub surface_snap_radius: f32,
    /// Search radius when probing a cell for class membership
    pub class_query_radius: f32,
    /// Search radius when snapping chosen link endpoints onto their class
    pub link_snap_radius: f32,
    /// Link endpoints must be further apart than this squared distance
    pub min_link_dist_sqr: f32,

    /// Area class used for sampling and reachability queries
    pub bridge_area: String,
    /// First traversal class
    pub class_one_area: String,
    /// Second traversal class
    pub class_two_area: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bounds: Aabb::default(),
            layer_mask: u32::MAX,
            max_slope_angle: 30.0,
            area_per_sample: 2.0,
            cell_size: Vec3::new(0.5, 2.0, 0.5),
            surface_snap_radius: 0.3,
            class_query_radius: 0.15,
            link_snap_radius: 5.0,
            min_link_dist_sqr: 0.25,
            bridge_area: "BakeLink".to_string(),
            class_one_area: "Jump".to_string(),
            class_two_area: "Walkable".to_string(),
        }
    }
}

impl AnalysisConfig {
    /// Creates a new AnalysisConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a default configuration sampling the given volume
    pub fn with_bounds(bounds: Aabb) -> Self {
        Self {
            bounds,
            ..Self::default()
        }
    }

    /// Validates the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !self.bounds.is_valid() || !self.bounds.min.is_finite() || !self.bounds.max.is_finite()
        {
            return Err(Error::InvalidConfig("Invalid sampling bounds".to_string()));
        }

        if !(self.cell_size.min_element() > 0.0) || !self.cell_size.is_finite() {
            return Err(Error::InvalidConfig("Invalid cell size".to_string()));
        }

        if !(0.0..=90.0).contains(&self.max_slope_angle) {
            return Err(Error::InvalidConfig("Invalid max slope angle".to_string()));
        }

        if !(self.area_per_sample > 0.0) {
            return Err(Error::InvalidConfig(
                "Invalid area per sample".to_string(),
            ));
        }

        for (name, radius) in [
            ("surface snap radius", self.surface_snap_radius),
            ("class query radius", self.class_query_radius),
            ("link snap radius", self.link_snap_radius),
        ] {
            if !(radius > 0.0) {
                return Err(Error::InvalidConfig(format!("Invalid {}", name)));
            }
        }

        if !(self.min_link_dist_sqr >= 0.0) {
            return Err(Error::InvalidConfig(
                "Invalid minimum link distance".to_string(),
            ));
        }

        for name in [&self.bridge_area, &self.class_one_area, &self.class_two_area] {
            if name.is_empty() {
                return Err(Error::InvalidConfig("Empty area class name".to_string()));
            }
        }

        Ok(())
    }
}
