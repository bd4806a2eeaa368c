//! Geometry kernel
//!
//! Pure functions over shapes and poses. Nothing in here knows about worlds
//! or collider ids:
//! - Bounds for placed shapes
//! - Shape-pair overlap with contact generation
//! - Point containment and ray casts

pub mod aabb;
pub mod contact;
pub mod point;
pub mod raycast;
pub mod shape;

pub use aabb::{Aabb, compute_world_aabb};
pub use contact::{Contact, closest_points_between_segments, intersect};
pub use point::point_in_shape;
pub use raycast::{RayHit, raycast_shape};
pub use shape::{CapsuleAxis, ConvexPolygon, Pose, Shape, ShapeKind, ShapeRef};
