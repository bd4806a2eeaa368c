//! Point containment

use glam::Vec2;

use super::shape::{Pose, Shape};
use crate::closest_point_on_segment;

/// Whether `point` lies inside `shape` placed at `pose` (boundary counts as inside)
pub fn point_in_shape(shape: &Shape, pose: Pose, point: Vec2) -> bool {
    match shape {
        Shape::Circle { radius } => (point - pose.position).length_squared() <= radius * radius,
        Shape::Box { half_extents } => {
            let d = (point - pose.position).abs();
            d.x <= half_extents.x && d.y <= half_extents.y
        }
        Shape::OrientedBox { half_extents } => {
            let d = pose.to_local(point).abs();
            d.x <= half_extents.x && d.y <= half_extents.y
        }
        Shape::Capsule {
            radius,
            half_length,
            axis,
        } => {
            let local = pose.to_local(point);
            let offset = axis.unit() * *half_length;
            let closest = closest_point_on_segment(local, -offset, offset);
            (local - closest).length_squared() <= radius * radius
        }
        Shape::Polygon(poly) => {
            let local = pose.to_local(point);
            poly.vertices()
                .iter()
                .zip(poly.normals())
                .all(|(v, n)| n.dot(local - *v) <= 0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::CapsuleAxis;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn test_point_in_hexagon() {
        let hexagon = Shape::regular_polygon(6, 28.0).unwrap();
        let center = Vec2::new(200.0, 150.0);
        let pose = Pose::at(center);

        assert!(point_in_shape(&hexagon, pose, center));
        assert!(!point_in_shape(&hexagon, pose, center + Vec2::new(40.0, 0.0)));
        assert!(!point_in_shape(&hexagon, pose, center + Vec2::new(-40.0, 0.0)));
        assert!(!point_in_shape(&hexagon, pose, center + Vec2::new(0.0, 40.0)));
        assert!(!point_in_shape(&hexagon, pose, center + Vec2::new(0.0, -40.0)));
    }

    #[test]
    fn test_point_in_rotated_box() {
        let obb = Shape::oriented_box(10.0, 1.0).unwrap();
        let pose = Pose::new(Vec2::ZERO, FRAC_PI_2);
        // Long axis now vertical
        assert!(point_in_shape(&obb, pose, Vec2::new(0.0, 9.0)));
        assert!(!point_in_shape(&obb, pose, Vec2::new(9.0, 0.0)));

        // Axis-aligned box ignores the same rotation
        let aabb = Shape::aabb(10.0, 1.0).unwrap();
        assert!(point_in_shape(&aabb, pose, Vec2::new(9.0, 0.0)));
    }

    #[test]
    fn test_point_in_capsule() {
        let capsule = Shape::capsule(2.0, 5.0, CapsuleAxis::X).unwrap();
        let pose = Pose::at(Vec2::ZERO);
        assert!(point_in_shape(&capsule, pose, Vec2::new(6.5, 0.0)));
        assert!(point_in_shape(&capsule, pose, Vec2::new(0.0, 1.9)));
        assert!(!point_in_shape(&capsule, pose, Vec2::new(7.5, 0.0)));
        assert!(!point_in_shape(&capsule, pose, Vec2::new(5.0, 2.0) + Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn test_point_in_circle_boundary() {
        let circle = Shape::circle(5.0).unwrap();
        let pose = Pose::new(Vec2::new(1.0, 1.0), FRAC_PI_4);
        assert!(point_in_shape(&circle, pose, Vec2::new(6.0, 1.0)));
        assert!(!point_in_shape(&circle, pose, Vec2::new(6.01, 1.0)));
    }
}
