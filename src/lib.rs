//! collide2d - 2D collision detection and spatial queries
//!
//! Core modules:
//! - `geom`: Shapes and the pure geometry kernel (AABBs, narrow phase, point and ray tests)
//! - `world`: Collider registry, spatial-hash broad phase and the query layer
//! - `config`: World configuration (serde)
//! - `error`: Error types

pub mod config;
pub mod error;
pub mod geom;
pub mod world;

pub use config::WorldConfig;
pub use error::{ConfigError, ShapeError, WorldError};
pub use geom::{
    Aabb, CapsuleAxis, Contact, ConvexPolygon, Pose, RayHit, Shape, ShapeRef, compute_world_aabb,
    intersect, point_in_shape, raycast_shape,
};
pub use world::{
    Collider, ColliderContact, ColliderId, ColliderRayHit, Layers, QueryScratch, SpatialHash,
    SweepHit, World, WorldStats,
};

use glam::Vec2;

/// Engine-wide constants
pub mod consts {
    /// Guards divisions by near-zero vector lengths
    pub const EPSILON: f32 = 1e-4;

    /// World defaults
    pub const DEFAULT_MAX_COLLIDERS: usize = 1024;
    pub const DEFAULT_CELL_SIZE: f32 = 64.0;
    pub const DEFAULT_SPATIAL_CAPACITY: usize = 256;
    pub const DEFAULT_DEDUP_CAPACITY: usize = 1024;
    pub const DEFAULT_MAX_QUERY_RESULTS: usize = 256;

    /// Polygon vertex limits
    pub const MIN_POLYGON_VERTICES: usize = 3;
    pub const MAX_POLYGON_VERTICES: usize = 8;

    /// Fixed bisection steps for shape casts (precision ~1/65536 of the path)
    pub const SWEEP_ITERATIONS: u32 = 16;
}

/// Rotate a vector counter-clockwise by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    if angle == 0.0 {
        return v;
    }
    Vec2::from_angle(angle).rotate(v)
}

/// Rotate a vector clockwise by `angle` radians (inverse of [`rotate`])
#[inline]
pub fn inverse_rotate(v: Vec2, angle: f32) -> Vec2 {
    if angle == 0.0 {
        return v;
    }
    Vec2::from_angle(-angle).rotate(v)
}

/// Closest point to `p` on the segment `a..b`
#[inline]
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < consts::EPSILON * consts::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// 2D cross product (z component of the 3D cross)
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}
