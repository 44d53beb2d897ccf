//! Common math, geometry and mesh types shared by the navlink crates

mod bounds;
mod geometry;
mod math;
mod mesh;
mod triangle;

pub use bounds::*;
pub use geometry::*;
pub use math::*;
pub use mesh::*;
pub use triangle::*;

/// Represents a 3D position
pub type Vec3 = glam::Vec3;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input mesh: {0}")]
    InvalidMesh(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown area class: {0}")]
    UnknownArea(String),

    #[error("invalid point table: {0}")]
    InvalidTable(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for navlink operations
pub type Result<T> = std::result::Result<T, Error>;
