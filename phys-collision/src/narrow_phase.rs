//! Narrow-phase shape-pair intersection tests.
//!
//! Each test produces zero or one [`ContactPoint`] with the normal pointing
//! from body A toward body B. Boxes are treated as world-aligned for these
//! tests; box–box is AABB overlap with a minimum-penetration-axis normal,
//! not an oriented SAT.
//!
//! Capsules participate in the broad phase only; a pair involving a capsule
//! yields no contact here.

use nalgebra::{Point3, Vector3};
use phys_types::{Collider, ColliderShape, ContactPoint};

use crate::broad_phase::Aabb;

/// Distance below which sphere tests are considered degenerate.
const DISTANCE_EPSILON: f64 = 1e-6;

/// Dispatch the narrow-phase test for a candidate pair.
///
/// `pos_a`/`pos_b` are the entity transform positions; collider offsets are
/// applied here. Returns at most one contact whose normal points from A
/// toward B.
#[must_use]
pub fn contact_for_pair(
    collider_a: &Collider,
    pos_a: Point3<f64>,
    collider_b: &Collider,
    pos_b: Point3<f64>,
) -> Option<ContactPoint> {
    let center_a = pos_a + collider_a.offset;
    let center_b = pos_b + collider_b.offset;

    match (collider_a.shape, collider_b.shape) {
        (ColliderShape::Sphere { radius: r_a }, ColliderShape::Sphere { radius: r_b }) => {
            sphere_sphere(center_a, r_a, center_b, r_b)
        }
        (
            ColliderShape::Box { half_extents: h_a },
            ColliderShape::Box { half_extents: h_b },
        ) => box_box(center_a, h_a, center_b, h_b),
        (ColliderShape::Box { half_extents }, ColliderShape::Sphere { radius }) => {
            box_sphere(center_a, half_extents, center_b, radius)
        }
        (ColliderShape::Sphere { radius }, ColliderShape::Box { half_extents }) => {
            box_sphere(center_b, half_extents, center_a, radius).map(ContactPoint::flip)
        }
        // No capsule narrow phase; capsule pairs pass through collision-free.
        (ColliderShape::Capsule { .. }, _) | (_, ColliderShape::Capsule { .. }) => None,
    }
}

/// Sphere–sphere test.
///
/// Colliding iff `0 < |d| < r_a + r_b` where `d = center_b - center_a`.
/// Exactly coincident centers are degenerate and produce no contact.
#[must_use]
pub fn sphere_sphere(
    center_a: Point3<f64>,
    radius_a: f64,
    center_b: Point3<f64>,
    radius_b: f64,
) -> Option<ContactPoint> {
    let direction = center_b - center_a;
    let distance = direction.norm();
    let radius_sum = radius_a + radius_b;

    if distance >= radius_sum || distance <= DISTANCE_EPSILON {
        return None;
    }

    let normal = direction / distance;
    let penetration = radius_sum - distance;
    let position = center_a + normal * (radius_a - penetration * 0.5);

    Some(ContactPoint::new(position, normal, penetration))
}

/// Box–box test on world-aligned AABBs.
///
/// Requires overlap on all three axes; the axis of minimum overlap becomes
/// the contact normal, pointing from A toward B, with the overlap amount as
/// penetration. Contact position is the midpoint of the two centers.
#[must_use]
pub fn box_box(
    center_a: Point3<f64>,
    half_a: Vector3<f64>,
    center_b: Point3<f64>,
    half_b: Vector3<f64>,
) -> Option<ContactPoint> {
    let a = Aabb::from_center(center_a, half_a);
    let b = Aabb::from_center(center_b, half_b);

    let mut min_axis = 0;
    let mut min_overlap = f64::INFINITY;
    for axis in 0..3 {
        let overlap = a.max[axis].min(b.max[axis]) - a.min[axis].max(b.min[axis]);
        if overlap <= 0.0 {
            return None;
        }
        if overlap < min_overlap {
            min_axis = axis;
            min_overlap = overlap;
        }
    }

    let mut normal = Vector3::zeros();
    normal[min_axis] = if center_a[min_axis] < center_b[min_axis] {
        1.0
    } else {
        -1.0
    };
    let position = nalgebra::center(&center_a, &center_b);

    Some(ContactPoint::new(position, normal, min_overlap))
}

/// Box–sphere test: per-axis clamp of the sphere center to the box yields
/// the closest point; the normal points from the box toward the sphere.
///
/// A sphere center inside the box (zero distance to the closest point) is
/// resolved by pushing out through the face with the smallest
/// penetration-to-extent ratio.
#[must_use]
pub fn box_sphere(
    box_center: Point3<f64>,
    half_extents: Vector3<f64>,
    sphere_center: Point3<f64>,
    radius: f64,
) -> Option<ContactPoint> {
    let aabb = Aabb::from_center(box_center, half_extents);
    let closest = aabb.closest_point(sphere_center);
    let direction = sphere_center - closest;
    let distance = direction.norm();

    if distance >= radius {
        return None;
    }

    let normal = if distance > DISTANCE_EPSILON {
        direction / distance
    } else {
        // Center inside the box: pick the face the center is closest to,
        // relative to the box extents.
        let to_center = sphere_center - box_center;
        let ratio = Vector3::new(
            to_center.x.abs() / half_extents.x,
            to_center.y.abs() / half_extents.y,
            to_center.z.abs() / half_extents.z,
        );

        let mut normal = Vector3::zeros();
        if ratio.x > ratio.y && ratio.x > ratio.z {
            normal.x = to_center.x.signum();
        } else if ratio.y > ratio.z {
            normal.y = to_center.y.signum();
        } else {
            normal.z = to_center.z.signum();
        }
        normal
    };

    Some(ContactPoint::new(closest, normal, radius - distance))
}
