//! Math utilities

use std::f32::consts::PI;

/// World up direction (y-up)
pub const UP: glam::Vec3 = glam::Vec3::Y;

/// Converts degrees to radians
#[inline]
pub fn deg_to_rad(deg: f32) -> f32 {
    deg * PI / 180.0
}

/// Minimum `normal · up` a surface may have to count as walkable for the
/// given maximum slope in degrees
#[inline]
pub fn walkable_threshold(max_slope_deg: f32) -> f32 {
    deg_to_rad(max_slope_deg).cos()
}
