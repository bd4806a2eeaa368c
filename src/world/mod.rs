//! Collision world
//!
//! - `collider`: ids, layer bits and collider records
//! - `spatial_hash`: grid-cell broad phase
//! - `registry`: the [`World`] slot table and its mutation API
//! - `query`: overlap, point, ray and sweep queries

pub mod collider;
pub mod query;
pub mod registry;
pub mod spatial_hash;

pub use collider::{Collider, ColliderId, Layers};
pub use query::{ColliderContact, ColliderRayHit, QueryScratch, SweepHit};
pub use registry::{World, WorldStats};
pub use spatial_hash::{CellRange, SpatialHash};
