//! Ray vs shape intersection
//!
//! Rays that start inside a shape hit at distance 0 with the normal facing
//! back along the ray.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::shape::{Pose, Shape};
use crate::consts::EPSILON;
use crate::{inverse_rotate, rotate};

/// Ray hit against a single shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayHit {
    /// World-space hit point
    pub point: Vec2,
    /// Surface normal at the hit point
    pub normal: Vec2,
    /// Distance from the ray origin
    pub distance: f32,
    /// `distance / max_distance`
    pub fraction: f32,
}

impl RayHit {
    fn at(origin: Vec2, dir: Vec2, distance: f32, normal: Vec2) -> Self {
        Self {
            point: origin + dir * distance,
            normal,
            distance,
            fraction: 0.0,
        }
    }

    /// Hit for a ray starting inside the shape
    fn inside(origin: Vec2, dir: Vec2) -> Self {
        Self::at(origin, dir, 0.0, -dir)
    }

    fn to_world(self, pose: Pose) -> Self {
        Self {
            point: pose.to_world(self.point),
            normal: rotate(self.normal, pose.rotation),
            ..self
        }
    }
}

/// Cast a ray against `shape` placed at `pose`
///
/// `dir` does not need to be normalized; a zero-length direction never hits.
pub fn raycast_shape(
    shape: &Shape,
    pose: Pose,
    origin: Vec2,
    dir: Vec2,
    max_distance: f32,
) -> Option<RayHit> {
    let len = dir.length();
    if len < EPSILON || max_distance.is_nan() || max_distance <= 0.0 {
        return None;
    }
    let dir = dir / len;

    let hit = match shape {
        Shape::Circle { radius } => ray_circle(origin, dir, pose.position, *radius, max_distance),
        Shape::Box { half_extents } => {
            ray_box(origin, dir, pose.position, *half_extents, max_distance)
        }
        Shape::OrientedBox { half_extents } => {
            let local_origin = pose.to_local(origin);
            let local_dir = inverse_rotate(dir, pose.rotation);
            ray_box(local_origin, local_dir, Vec2::ZERO, *half_extents, max_distance)
                .map(|h| h.to_world(pose))
        }
        Shape::Capsule {
            radius,
            half_length,
            axis,
        } => {
            let local_origin = pose.to_local(origin);
            let local_dir = inverse_rotate(dir, pose.rotation);
            let offset = axis.unit() * *half_length;

            let caps = [offset, -offset]
                .into_iter()
                .filter_map(|c| ray_circle(local_origin, local_dir, c, *radius, max_distance));
            // Core rectangle between the caps
            let side = (*half_length > EPSILON)
                .then(|| {
                    let half = offset + axis.unit().perp().abs() * *radius;
                    ray_box(local_origin, local_dir, Vec2::ZERO, half, max_distance)
                })
                .flatten();

            caps.chain(side)
                .min_by(|a, b| a.distance.total_cmp(&b.distance))
                .map(|h| h.to_world(pose))
        }
        Shape::Polygon(poly) => {
            let local_origin = pose.to_local(origin);
            let local_dir = inverse_rotate(dir, pose.rotation);
            ray_polygon(
                local_origin,
                local_dir,
                poly.vertices(),
                poly.normals(),
                max_distance,
            )
            .map(|h| h.to_world(pose))
        }
    }?;

    Some(RayHit {
        fraction: hit.distance / max_distance,
        ..hit
    })
}

/// Quadratic solve against a circle
fn ray_circle(origin: Vec2, dir: Vec2, center: Vec2, radius: f32, max_distance: f32) -> Option<RayHit> {
    let m = origin - center;
    let b = m.dot(dir);
    let c = m.length_squared() - radius * radius;

    // Outside and pointing away
    if c > 0.0 && b > 0.0 {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    let t = -b - discriminant.sqrt();
    if t < 0.0 {
        return Some(RayHit::inside(origin, dir));
    }
    if t > max_distance {
        return None;
    }

    let point = origin + dir * t;
    let normal = ((point - center) / radius).normalize_or(-dir);
    Some(RayHit::at(origin, dir, t, normal))
}

/// Slab test against an axis-aligned box
fn ray_box(origin: Vec2, dir: Vec2, center: Vec2, half: Vec2, max_distance: f32) -> Option<RayHit> {
    let min = center - half;
    let max = center + half;
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut enter_normal = Vec2::ZERO;

    for axis in 0..2 {
        let o = origin[axis];
        let d = dir[axis];
        if d.abs() < f32::EPSILON {
            // Parallel to this slab
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t1 = (min[axis] - o) * inv;
        let mut t2 = (max[axis] - o) * inv;
        let mut sign = -1.0;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
            sign = 1.0;
        }

        if t1 > t_enter {
            t_enter = t1;
            enter_normal = Vec2::ZERO;
            enter_normal[axis] = sign;
        }
        t_exit = t_exit.min(t2);
        if t_enter > t_exit {
            return None;
        }
    }

    if t_exit < 0.0 {
        return None;
    }
    if t_enter < 0.0 {
        return Some(RayHit::inside(origin, dir));
    }
    if t_enter > max_distance {
        return None;
    }
    Some(RayHit::at(origin, dir, t_enter, enter_normal))
}

/// Cyrus-Beck clipping against a convex polygon's edge half-planes
fn ray_polygon(
    origin: Vec2,
    dir: Vec2,
    vertices: &[Vec2],
    normals: &[Vec2],
    max_distance: f32,
) -> Option<RayHit> {
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = max_distance;
    let mut enter_normal = -dir;

    for (v, n) in vertices.iter().zip(normals) {
        let numerator = n.dot(*v - origin);
        let denom = n.dot(dir);
        if denom.abs() < f32::EPSILON {
            // Parallel edge: outside its half-plane means no hit at all
            if numerator < 0.0 {
                return None;
            }
            continue;
        }

        let t = numerator / denom;
        if denom < 0.0 {
            if t > t_enter {
                t_enter = t;
                enter_normal = *n;
            }
        } else {
            t_exit = t_exit.min(t);
        }
        if t_enter > t_exit {
            return None;
        }
    }

    if t_exit < 0.0 {
        return None;
    }
    if t_enter < 0.0 {
        return Some(RayHit::inside(origin, dir));
    }
    Some(RayHit::at(origin, dir, t_enter, enter_normal))
}
