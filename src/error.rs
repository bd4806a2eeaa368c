//! Error types
//!
//! Shape construction and world mutation report failures through these enums
//! instead of sentinel values. Stale collider ids are not errors: accessors
//! read them as "not found".

use thiserror::Error;

/// Shape construction errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    /// A dimension was zero, negative or not finite
    #[error("invalid {name}: {value}")]
    InvalidDimension { name: &'static str, value: f32 },

    /// Polygon vertex count outside 3..=8
    #[error("polygon needs 3 to 8 vertices, got {0}")]
    VertexCount(usize),

    /// Polygon vertices enclose no area
    #[error("polygon is degenerate (zero area)")]
    Degenerate,

    /// Polygon vertices do not form a convex outline
    #[error("polygon is not convex")]
    NotConvex,
}

/// World creation and mutation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorldError {
    /// Every collider slot is in use
    #[error("world is full ({capacity} colliders)")]
    Full { capacity: usize },

    /// Configuration rejected at world creation
    #[error("invalid world config: {0}")]
    InvalidConfig(String),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("config read error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse or write failure
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parsed config failed validation
    #[error("{0}")]
    Invalid(#[from] WorldError),
}
