//! Narrow phase: shape-vs-shape intersection with contact generation
//!
//! Pairs are evaluated in canonical kind order (circle, box, oriented box,
//! capsule, polygon) and the normal is negated when the caller passed them the
//! other way round, so `intersect(a, b)` and `intersect(b, a)` always agree.
//!
//! Normal conventions:
//! - most pairs report a normal pointing from A towards B
//! - circle vs box (and circle vs oriented box) reports the direction that
//!   pushes the circle out of the box; with the circle centre inside the box
//!   that is the nearest face's outward normal, and depth is the distance to
//!   that face
//! - pairs without an exact test fall back to AABB overlap: zero depth, normal
//!   `+X` in canonical order

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::aabb::{Aabb, compute_world_aabb};
use super::shape::{Pose, Shape};
use crate::consts::EPSILON;
use crate::{closest_point_on_segment, rotate};

/// Result of a successful narrow-phase test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Unit contact normal (see module docs for direction)
    pub normal: Vec2,
    /// Penetration depth along the normal
    pub depth: f32,
    points: [Vec2; 2],
    point_count: u8,
}

impl Contact {
    /// Build a contact keeping at most two points
    pub fn new(normal: Vec2, depth: f32, points: &[Vec2]) -> Self {
        let mut stored = [Vec2::ZERO; 2];
        let count = points.len().min(2);
        stored[..count].copy_from_slice(&points[..count]);
        Self {
            normal,
            depth,
            points: stored,
            point_count: count as u8,
        }
    }

    /// Contact points in world space (zero to two)
    #[inline]
    pub fn points(&self) -> &[Vec2] {
        &self.points[..self.point_count as usize]
    }

    /// Same contact seen from the other shape
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }

    /// Move a contact computed in `pose`-local space into world space
    fn transformed(self, pose: Pose) -> Self {
        let mut out = self;
        out.normal = rotate(self.normal, pose.rotation);
        for p in &mut out.points[..self.point_count as usize] {
            *p = pose.to_world(*p);
        }
        out
    }
}

/// Test two placed shapes for overlap
pub fn intersect(a: &Shape, pose_a: Pose, b: &Shape, pose_b: Pose) -> Option<Contact> {
    if a.kind() <= b.kind() {
        intersect_ordered(a, pose_a, b, pose_b)
    } else {
        intersect_ordered(b, pose_b, a, pose_a).map(Contact::flipped)
    }
}

/// Dispatch with `a.kind() <= b.kind()`
fn intersect_ordered(a: &Shape, pose_a: Pose, b: &Shape, pose_b: Pose) -> Option<Contact> {
    match (a, b) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(pose_a.position, *ra, pose_b.position, *rb, Vec2::X)
        }
        (Shape::Circle { radius }, Shape::Box { half_extents }) => {
            circle_box(pose_a.position, *radius, pose_b.position, *half_extents)
        }
        (Shape::Box { half_extents: ha }, Shape::Box { half_extents: hb }) => {
            box_box(pose_a.position, *ha, pose_b.position, *hb)
        }
        (Shape::Circle { radius }, Shape::OrientedBox { half_extents }) => {
            let local = pose_b.to_local(pose_a.position);
            circle_box(local, *radius, Vec2::ZERO, *half_extents).map(|c| c.transformed(pose_b))
        }
        (Shape::OrientedBox { half_extents: ha }, Shape::OrientedBox { half_extents: hb }) => {
            oriented_box_box(pose_a, *ha, pose_b, *hb)
        }
        (Shape::Circle { radius }, Shape::Capsule { radius: cap_r, .. }) => {
            let (s0, s1) = b.capsule_segment(pose_b)?;
            let closest = closest_point_on_segment(pose_a.position, s0, s1);
            let fallback = segment_normal(s0, s1);
            circle_circle(pose_a.position, *radius, closest, *cap_r, -fallback)
        }
        (Shape::Capsule { radius: ra, .. }, Shape::Capsule { radius: rb, .. }) => {
            let (a0, a1) = a.capsule_segment(pose_a)?;
            let (b0, b1) = b.capsule_segment(pose_b)?;
            let (pa, pb) = closest_points_between_segments(a0, a1, b0, b1);
            let between = (pose_b.position - pose_a.position).normalize_or_zero();
            let fallback = if between == Vec2::ZERO {
                segment_normal(a0, a1)
            } else {
                between
            };
            circle_circle(pa, *ra, pb, *rb, fallback)
        }
        _ => aabb_fallback(a, pose_a, b, pose_b),
    }
}

/// Overlap iff the centre distance is below the radius sum
fn circle_circle(ca: Vec2, ra: f32, cb: Vec2, rb: f32, fallback_normal: Vec2) -> Option<Contact> {
    let delta = cb - ca;
    let dist_sq = delta.length_squared();
    let radii = ra + rb;
    if dist_sq >= radii * radii {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > EPSILON {
        delta / dist
    } else {
        fallback_normal
    };
    let depth = radii - dist;
    // Midpoint of the overlapping region along the normal
    let point = ca + normal * (ra - depth * 0.5);
    Some(Contact::new(normal, depth, &[point]))
}

/// Circle against an unrotated box; normal pushes the circle out of the box
fn circle_box(center: Vec2, radius: f32, box_center: Vec2, half: Vec2) -> Option<Contact> {
    let local = center - box_center;
    let closest = local.clamp(-half, half);
    let delta = local - closest;
    let dist_sq = delta.length_squared();

    if local.x.abs() > half.x || local.y.abs() > half.y {
        if dist_sq >= radius * radius {
            return None;
        }
        let dist = dist_sq.sqrt();
        // Centre barely outside a face: take that face's normal
        let normal = if dist > EPSILON {
            delta / dist
        } else if local.x.abs() - half.x >= local.y.abs() - half.y {
            Vec2::new(local.x.signum(), 0.0)
        } else {
            Vec2::new(0.0, local.y.signum())
        };
        return Some(Contact::new(normal, radius - dist, &[box_center + closest]));
    }

    // Centre inside the box: exit through the nearest face
    let faces = [
        (local.x + half.x, Vec2::NEG_X),
        (half.x - local.x, Vec2::X),
        (local.y + half.y, Vec2::NEG_Y),
        (half.y - local.y, Vec2::Y),
    ];
    let (depth, normal) = faces
        .into_iter()
        .fold(faces[0], |best, face| if face.0 < best.0 { face } else { best });
    let on_face = local + normal * depth;
    Some(Contact::new(normal, depth, &[box_center + on_face]))
}

fn box_box(ca: Vec2, ha: Vec2, cb: Vec2, hb: Vec2) -> Option<Contact> {
    let d = cb - ca;
    let overlap = (ha + hb) - d.abs();
    if overlap.x <= 0.0 || overlap.y <= 0.0 {
        return None;
    }

    let region = Aabb::from_center_half_extents(ca, ha)
        .intersection(&Aabb::from_center_half_extents(cb, hb))?;
    let mid = region.center();

    if overlap.x < overlap.y {
        let normal = if d.x < 0.0 { Vec2::NEG_X } else { Vec2::X };
        Some(Contact::new(
            normal,
            overlap.x,
            &[Vec2::new(mid.x, region.min.y), Vec2::new(mid.x, region.max.y)],
        ))
    } else {
        let normal = if d.y < 0.0 { Vec2::NEG_Y } else { Vec2::Y };
        Some(Contact::new(
            normal,
            overlap.y,
            &[Vec2::new(region.min.x, mid.y), Vec2::new(region.max.x, mid.y)],
        ))
    }
}

/// SAT over both boxes' local axes
fn oriented_box_box(pose_a: Pose, ha: Vec2, pose_b: Pose, hb: Vec2) -> Option<Contact> {
    let axes_a = [rotate(Vec2::X, pose_a.rotation), rotate(Vec2::Y, pose_a.rotation)];
    let axes_b = [rotate(Vec2::X, pose_b.rotation), rotate(Vec2::Y, pose_b.rotation)];
    let d = pose_b.position - pose_a.position;

    let mut best: Option<(f32, Vec2)> = None;
    for axis in axes_a.iter().chain(axes_b.iter()).copied() {
        let proj_a = ha.x * axes_a[0].dot(axis).abs() + ha.y * axes_a[1].dot(axis).abs();
        let proj_b = hb.x * axes_b[0].dot(axis).abs() + hb.y * axes_b[1].dot(axis).abs();
        let overlap = proj_a + proj_b - d.dot(axis).abs();
        if overlap <= 0.0 {
            return None;
        }
        if best.is_none_or(|(min, _)| overlap < min) {
            best = Some((overlap, axis));
        }
    }

    let (depth, mut normal) = best?;
    if normal.dot(d) < 0.0 {
        normal = -normal;
    }

    // Corners of each box that sit inside the other
    let mut points = Vec::with_capacity(2);
    for (pose, half, other_pose, other_half) in [
        (pose_b, hb, pose_a, ha),
        (pose_a, ha, pose_b, hb),
    ] {
        for corner in box_corners(half) {
            let world = pose.to_world(corner);
            let local = other_pose.to_local(world).abs();
            if local.x <= other_half.x + EPSILON && local.y <= other_half.y + EPSILON {
                points.push(world);
            }
        }
    }
    if points.is_empty() {
        points.push(pose_a.position + d * 0.5);
    }

    Some(Contact::new(normal, depth, &points))
}

/// Coarse fallback for pairs without an exact test
fn aabb_fallback(a: &Shape, pose_a: Pose, b: &Shape, pose_b: Pose) -> Option<Contact> {
    let region = compute_world_aabb(a, pose_a).intersection(&compute_world_aabb(b, pose_b))?;
    Some(Contact::new(Vec2::X, 0.0, &[region.center()]))
}

fn box_corners(half: Vec2) -> [Vec2; 4] {
    [
        Vec2::new(-half.x, -half.y),
        Vec2::new(half.x, -half.y),
        Vec2::new(half.x, half.y),
        Vec2::new(-half.x, half.y),
    ]
}

/// Unit perpendicular of a segment (or +X when degenerate)
fn segment_normal(a: Vec2, b: Vec2) -> Vec2 {
    let perp = (b - a).perp().normalize_or_zero();
    if perp == Vec2::ZERO { Vec2::X } else { perp }
}

/// Closest points between segments `p1..q1` and `p2..q2`
pub fn closest_points_between_segments(p1: Vec2, q1: Vec2, p2: Vec2, q2: Vec2) -> (Vec2, Vec2) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);
    let eps = EPSILON * EPSILON;

    if a <= eps && e <= eps {
        return (p1, p2);
    }

    let (s, t) = if a <= eps {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= eps {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            // Parallel segments: any s works, start from p1
            let s = if denom > eps {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let t = (b * s + f) / e;
            if t < 0.0 {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else if t > 1.0 {
                (((b - c) / a).clamp(0.0, 1.0), 1.0)
            } else {
                (s, t)
            }
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}
