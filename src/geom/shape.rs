//! Shape primitives and poses
//!
//! Shapes hold local-space geometry only. Placement comes from a [`Pose`]
//! supplied at test time, so a single shape can back many colliders.

use std::f32::consts::TAU;
use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ShapeError;
use crate::{cross, inverse_rotate, rotate};

/// Shared, immutable shape handle. A collider keeps its shape alive.
pub type ShapeRef = Arc<Shape>;

/// Placement of a shape: world position plus rotation in radians
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec2,
    pub rotation: f32,
}

impl Pose {
    pub fn new(position: Vec2, rotation: f32) -> Self {
        Self { position, rotation }
    }

    /// Unrotated pose at `position`
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            rotation: 0.0,
        }
    }

    /// Local point to world space
    #[inline]
    pub fn to_world(&self, local: Vec2) -> Vec2 {
        self.position + rotate(local, self.rotation)
    }

    /// World point to local space
    #[inline]
    pub fn to_local(&self, world: Vec2) -> Vec2 {
        inverse_rotate(world - self.position, self.rotation)
    }

    /// Same rotation, position moved by `delta`
    #[inline]
    pub fn translated(&self, delta: Vec2) -> Self {
        Self {
            position: self.position + delta,
            rotation: self.rotation,
        }
    }
}

/// Local axis a capsule's core segment runs along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CapsuleAxis {
    #[default]
    X,
    Y,
}

impl CapsuleAxis {
    #[inline]
    pub fn unit(&self) -> Vec2 {
        match self {
            CapsuleAxis::X => Vec2::X,
            CapsuleAxis::Y => Vec2::Y,
        }
    }
}

/// Convex polygon centred on its area centroid, wound counter-clockwise
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvexPolygon {
    vertices: Vec<Vec2>,
    /// Outward unit normal of the edge `vertices[i] -> vertices[i + 1]`
    normals: Vec<Vec2>,
}

impl ConvexPolygon {
    /// Validate, re-centre and wind the outline
    pub fn new(points: &[Vec2]) -> Result<Self, ShapeError> {
        let n = points.len();
        if !(MIN_POLYGON_VERTICES..=MAX_POLYGON_VERTICES).contains(&n) {
            return Err(ShapeError::VertexCount(n));
        }
        if let Some(bad) = points.iter().find(|p| !p.is_finite()) {
            return Err(ShapeError::InvalidDimension {
                name: "vertex",
                value: if bad.x.is_finite() { bad.y } else { bad.x },
            });
        }

        // Shoelace area and area-weighted centroid
        let mut twice_area = 0.0;
        let mut centroid = Vec2::ZERO;
        for i in 0..n {
            let a = points[i];
            let b = points[(i + 1) % n];
            let c = cross(a, b);
            twice_area += c;
            centroid += (a + b) * c;
        }
        if twice_area.abs() < EPSILON {
            return Err(ShapeError::Degenerate);
        }
        centroid /= 3.0 * twice_area;

        let mut vertices: Vec<Vec2> = points.iter().map(|&p| p - centroid).collect();
        if twice_area < 0.0 {
            vertices.reverse();
        }

        let mut normals = Vec::with_capacity(n);
        let mut turning = 0.0;
        for i in 0..n {
            let edge = vertices[(i + 1) % n] - vertices[i];
            let next = vertices[(i + 2) % n] - vertices[(i + 1) % n];
            if edge.length_squared() < EPSILON * EPSILON {
                return Err(ShapeError::Degenerate);
            }
            let turn = cross(edge, next);
            if turn < -EPSILON {
                return Err(ShapeError::NotConvex);
            }
            turning += turn.atan2(edge.dot(next));
            normals.push(Vec2::new(edge.y, -edge.x).normalize());
        }
        // A simple convex outline turns exactly once; stars wind more
        if (turning - TAU).abs() > 1e-3 {
            return Err(ShapeError::NotConvex);
        }

        Ok(Self { vertices, normals })
    }

    /// Regular polygon with the given circumradius
    pub fn regular(sides: usize, circumradius: f32) -> Result<Self, ShapeError> {
        if !circumradius.is_finite() || circumradius <= 0.0 {
            return Err(ShapeError::InvalidDimension {
                name: "circumradius",
                value: circumradius,
            });
        }
        if !(MIN_POLYGON_VERTICES..=MAX_POLYGON_VERTICES).contains(&sides) {
            return Err(ShapeError::VertexCount(sides));
        }
        let points: Vec<Vec2> = (0..sides)
            .map(|i| Vec2::from_angle(TAU * i as f32 / sides as f32) * circumradius)
            .collect();
        Self::new(&points)
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    #[inline]
    pub fn normals(&self) -> &[Vec2] {
        &self.normals
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Geometric primitive in local space
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Shape {
    Circle {
        radius: f32,
    },
    /// Axis-aligned box; pose rotation is ignored
    Box {
        half_extents: Vec2,
    },
    OrientedBox {
        half_extents: Vec2,
    },
    /// Core segment of length `2 * half_length` along `axis`, swept by `radius`
    Capsule {
        radius: f32,
        half_length: f32,
        axis: CapsuleAxis,
    },
    Polygon(ConvexPolygon),
}

/// Shape discriminant, ordered for pair dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShapeKind {
    Circle,
    Box,
    OrientedBox,
    Capsule,
    Polygon,
}

fn positive(name: &'static str, value: f32) -> Result<f32, ShapeError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ShapeError::InvalidDimension { name, value })
    }
}

impl Shape {
    pub fn circle(radius: f32) -> Result<Self, ShapeError> {
        Ok(Shape::Circle {
            radius: positive("radius", radius)?,
        })
    }

    /// Axis-aligned box from half width and half height
    pub fn aabb(half_w: f32, half_h: f32) -> Result<Self, ShapeError> {
        Ok(Shape::Box {
            half_extents: Vec2::new(positive("half_w", half_w)?, positive("half_h", half_h)?),
        })
    }

    /// Rotatable box from half width and half height
    pub fn oriented_box(half_w: f32, half_h: f32) -> Result<Self, ShapeError> {
        Ok(Shape::OrientedBox {
            half_extents: Vec2::new(positive("half_w", half_w)?, positive("half_h", half_h)?),
        })
    }

    /// Capsule; a zero `half_length` degenerates to a circle
    pub fn capsule(radius: f32, half_length: f32, axis: CapsuleAxis) -> Result<Self, ShapeError> {
        if !half_length.is_finite() || half_length < 0.0 {
            return Err(ShapeError::InvalidDimension {
                name: "half_length",
                value: half_length,
            });
        }
        Ok(Shape::Capsule {
            radius: positive("radius", radius)?,
            half_length,
            axis,
        })
    }

    /// Convex polygon from 3 to 8 vertices in any winding
    pub fn polygon(vertices: &[Vec2]) -> Result<Self, ShapeError> {
        ConvexPolygon::new(vertices).map(Shape::Polygon)
    }

    pub fn regular_polygon(sides: usize, circumradius: f32) -> Result<Self, ShapeError> {
        ConvexPolygon::regular(sides, circumradius).map(Shape::Polygon)
    }

    /// Wrap in a shared handle
    pub fn shared(self) -> ShapeRef {
        Arc::new(self)
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Circle { .. } => ShapeKind::Circle,
            Shape::Box { .. } => ShapeKind::Box,
            Shape::OrientedBox { .. } => ShapeKind::OrientedBox,
            Shape::Capsule { .. } => ShapeKind::Capsule,
            Shape::Polygon(_) => ShapeKind::Polygon,
        }
    }

    /// World-space endpoints of a capsule's core segment
    pub fn capsule_segment(&self, pose: Pose) -> Option<(Vec2, Vec2)> {
        match self {
            Shape::Capsule {
                half_length, axis, ..
            } => {
                let offset = axis.unit() * *half_length;
                Some((pose.to_world(-offset), pose.to_world(offset)))
            }
            _ => None,
        }
    }

    /// Radius of the smallest origin-centred circle enclosing the shape
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Shape::Circle { radius } => *radius,
            Shape::Box { half_extents } | Shape::OrientedBox { half_extents } => {
                half_extents.length()
            }
            Shape::Capsule {
                radius,
                half_length,
                ..
            } => radius + half_length,
            Shape::Polygon(poly) => poly
                .vertices()
                .iter()
                .map(|v| v.length())
                .fold(0.0, f32::max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_dimensions_rejected() {
        assert!(matches!(
            Shape::circle(0.0),
            Err(ShapeError::InvalidDimension { name: "radius", .. })
        ));
        assert!(Shape::circle(-1.0).is_err());
        assert!(Shape::aabb(1.0, 0.0).is_err());
        assert!(Shape::oriented_box(f32::INFINITY, 1.0).is_err());
        assert!(Shape::capsule(1.0, -0.5, CapsuleAxis::X).is_err());
        assert!(Shape::capsule(1.0, 0.0, CapsuleAxis::X).is_ok());
    }

    #[test]
    fn test_polygon_vertex_count_limits() {
        let tri = [Vec2::ZERO, Vec2::X, Vec2::Y];
        assert!(Shape::polygon(&tri).is_ok());
        assert_eq!(
            Shape::polygon(&tri[..2]),
            Err(ShapeError::VertexCount(2))
        );
        assert_eq!(
            Shape::regular_polygon(9, 10.0),
            Err(ShapeError::VertexCount(9))
        );
        assert!(Shape::regular_polygon(8, 10.0).is_ok());
    }

    #[test]
    fn test_polygon_recentred_and_wound_ccw() {
        // Clockwise square away from the origin
        let square = ConvexPolygon::new(&[
            Vec2::new(10.0, 10.0),
            Vec2::new(10.0, 12.0),
            Vec2::new(12.0, 12.0),
            Vec2::new(12.0, 10.0),
        ])
        .unwrap();

        let sum: Vec2 = square.vertices().iter().copied().sum();
        assert!(sum.length() < 0.001);

        // Outward normals point away from the centroid
        for (v, n) in square.vertices().iter().zip(square.normals()) {
            assert!(v.dot(*n) > 0.0);
            assert!((n.length() - 1.0).abs() < 0.0001);
        }
    }

    #[test]
    fn test_degenerate_and_concave_polygons() {
        let collinear = [Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)];
        assert_eq!(Shape::polygon(&collinear), Err(ShapeError::Degenerate));

        let arrow = [
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 4.0),
        ];
        assert_eq!(Shape::polygon(&arrow), Err(ShapeError::NotConvex));

        // Every turn is a left turn, but the outline crosses itself
        let pentagram: Vec<Vec2> = [0, 2, 4, 1, 3]
            .iter()
            .map(|&k| Vec2::from_angle(TAU * k as f32 / 5.0) * 10.0)
            .collect();
        assert_eq!(Shape::polygon(&pentagram), Err(ShapeError::NotConvex));
        assert!(Shape::regular_polygon(5, 10.0).is_ok());
    }

    #[test]
    fn test_bounding_radius_encloses_shape() {
        assert_eq!(Shape::circle(3.0).unwrap().bounding_radius(), 3.0);
        assert!((Shape::aabb(3.0, 4.0).unwrap().bounding_radius() - 5.0).abs() < 0.0001);
        let capsule = Shape::capsule(2.0, 6.0, CapsuleAxis::Y).unwrap();
        assert_eq!(capsule.bounding_radius(), 8.0);
        let hexagon = Shape::regular_polygon(6, 10.0).unwrap();
        assert!((hexagon.bounding_radius() - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_capsule_segment_rotates_with_pose() {
        let capsule = Shape::capsule(1.0, 5.0, CapsuleAxis::X).unwrap();
        let (a, b) = capsule
            .capsule_segment(Pose::new(Vec2::new(1.0, 1.0), std::f32::consts::FRAC_PI_2))
            .unwrap();
        assert!((a - Vec2::new(1.0, -4.0)).length() < 0.001);
        assert!((b - Vec2::new(1.0, 6.0)).length() < 0.001);
        assert!(Shape::circle(1.0).unwrap().capsule_segment(Pose::default()).is_none());
    }
}
