//! Axis-aligned bounding boxes and world-space bounds for shapes

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::shape::{Pose, Shape};
use crate::rotate;

/// Axis-aligned bounding box (inclusive bounds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extents(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest box containing every point (empty input gives a zero box at the origin)
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Self {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::new(Vec2::ZERO, Vec2::ZERO);
        };
        iter.fold(Self::new(first, first), |aabb, p| Self {
            min: aabb.min.min(p),
            max: aabb.max.max(p),
        })
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    /// Overlap test, touching edges count as overlapping
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    #[inline]
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Overlapping region, if any
    pub fn intersection(&self, other: &Aabb) -> Option<Aabb> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Aabb {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        })
    }
}

/// World-space bounds of `shape` placed at `pose`
///
/// Exact for circles and axis-aligned boxes; rotated corners for oriented
/// boxes and polygons; union of the two end caps for capsules. Axis-aligned
/// boxes ignore the pose rotation.
pub fn compute_world_aabb(shape: &Shape, pose: Pose) -> Aabb {
    match shape {
        Shape::Circle { radius } => {
            Aabb::from_center_half_extents(pose.position, Vec2::splat(*radius))
        }
        Shape::Box { half_extents } => Aabb::from_center_half_extents(pose.position, *half_extents),
        Shape::OrientedBox { half_extents } => {
            let h = *half_extents;
            let corners = [
                Vec2::new(-h.x, -h.y),
                Vec2::new(h.x, -h.y),
                Vec2::new(h.x, h.y),
                Vec2::new(-h.x, h.y),
            ];
            Aabb::from_points(corners.iter().map(|&c| pose.position + rotate(c, pose.rotation)))
        }
        Shape::Capsule { radius, .. } => {
            let (a, b) = shape.capsule_segment(pose).unwrap_or((pose.position, pose.position));
            let r = Vec2::splat(*radius);
            Aabb::from_center_half_extents(a, r).union(&Aabb::from_center_half_extents(b, r))
        }
        Shape::Polygon(poly) => Aabb::from_points(
            poly.vertices()
                .iter()
                .map(|&v| pose.position + rotate(v, pose.rotation)),
        ),
    }
}
