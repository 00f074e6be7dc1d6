//! Fixed-timestep rigid-body simulation core.
//!
//! This crate ties the `phys` stack together: a dense component store, the
//! sequential-impulse contact solver, and the [`PhysicsSystem`] driver that
//! runs the fixed-step loop.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      PhysicsSystem                          │
//! │  accumulator → forces → broad → narrow → solve → positions  │
//! │  → sleep  (fixed order, every step)                         │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         World                               │
//! │  dense stores: Transform, RigidBody, Collider, Projectile   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```
//! use nalgebra::{Point3, Vector3};
//! use phys_core::{PhysicsSystem, World};
//! use phys_types::{Collider, ColliderShape, RigidBody};
//!
//! let mut world = World::new();
//!
//! // A static floor spanning y ∈ [-0.5, 0.5].
//! let floor = world.spawn(Point3::origin());
//! world.bodies.insert(floor, RigidBody::fixed());
//! world.colliders.insert(
//!     floor,
//!     Collider::new(ColliderShape::box_shape(Vector3::new(5.0, 0.5, 5.0))),
//! );
//!
//! // A sphere dropped from above.
//! let ball = world.spawn(Point3::new(0.0, 3.0, 0.0));
//! world.bodies.insert(ball, RigidBody::dynamic(1.0));
//! world
//!     .colliders
//!     .insert(ball, Collider::new(ColliderShape::sphere(0.5)));
//!
//! let mut physics = PhysicsSystem::new();
//! physics.update(&mut world, 1.0); // one second of fixed steps
//!
//! let y = world.transforms.get(ball).unwrap().position.y;
//! assert!(y < 3.0);
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

pub mod ballistics;
mod solver;
mod store;
mod system;

pub use ballistics::{BallisticsSystem, Projectile};
pub use solver::{ContactSolver, SolverConfig};
pub use store::{ComponentStore, Transform, World};
pub use system::{PhysicsSystem, RaycastHit};

// Re-export the lower layers for convenience.
pub use phys_collision::{Aabb, BroadPhaseAlgorithm, BroadPhaseConfig};
pub use phys_types::{
    BodyType, Collider, ColliderShape, CollisionEvent, ContactPoint, Entity, Material,
    PhysicsConstants, PhysicsError, RigidBody,
};

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    const DT: f64 = 1.0 / 60.0;

    fn spawn_sphere(world: &mut World, position: Point3<f64>, radius: f64) -> Entity {
        let entity = world.spawn(position);
        world.bodies.insert(entity, RigidBody::dynamic(1.0));
        world
            .colliders
            .insert(entity, Collider::new(ColliderShape::sphere(radius)));
        entity
    }

    fn spawn_static_box(
        world: &mut World,
        position: Point3<f64>,
        half_extents: Vector3<f64>,
    ) -> Entity {
        let entity = world.spawn(position);
        world.bodies.insert(entity, RigidBody::fixed());
        world
            .colliders
            .insert(entity, Collider::new(ColliderShape::box_shape(half_extents)));
        entity
    }

    #[test]
    fn test_accumulator_runs_whole_steps_only() {
        let mut world = World::new();
        spawn_sphere(&mut world, Point3::new(0.0, 10.0, 0.0), 0.5);

        // An exactly representable timestep keeps the accumulator
        // arithmetic exact, so the step counts below are not subject to
        // rounding in the test itself.
        let h = 1.0 / 64.0;
        let mut physics = PhysicsSystem::new();
        physics.set_fixed_timestep(h);

        physics.update(&mut world, h * 0.5);
        assert_eq!(physics.step_count(), 0);

        physics.update(&mut world, h * 0.5);
        assert_eq!(physics.step_count(), 1);

        physics.update(&mut world, h * 3.0);
        assert_eq!(physics.step_count(), 4);
    }

    #[test]
    fn test_fixed_step_determinism() {
        let build = || {
            let mut world = World::new();
            spawn_static_box(&mut world, Point3::origin(), Vector3::new(5.0, 0.5, 5.0));
            spawn_sphere(&mut world, Point3::new(0.0, 1.2, 0.0), 0.5);
            spawn_sphere(&mut world, Point3::new(0.3, 2.0, 0.1), 0.5);
            world
        };

        let mut world_a = build();
        let mut world_b = build();

        let h = 1.0 / 64.0;
        let mut physics_a = PhysicsSystem::new();
        let mut physics_b = PhysicsSystem::new();
        physics_a.set_fixed_timestep(h);
        physics_b.set_fixed_timestep(h);

        // One call covering three timesteps vs three single-step calls.
        physics_a.update(&mut world_a, 3.0 * h);
        for _ in 0..3 {
            physics_b.update(&mut world_b, h);
        }

        assert_eq!(physics_a.step_count(), physics_b.step_count());
        for (entity, transform_a) in world_a.transforms.iter() {
            let transform_b = world_b.transforms.get(entity).unwrap();
            assert_eq!(transform_a.position, transform_b.position);
            assert_eq!(transform_a.rotation, transform_b.rotation);
        }
        for (entity, body_a) in world_a.bodies.iter() {
            let body_b = world_b.bodies.get(entity).unwrap();
            assert_eq!(body_a.velocity, body_b.velocity);
            assert_eq!(body_a.angular_velocity, body_b.angular_velocity);
        }
    }

    #[test]
    fn test_disabled_simulation_is_noop() {
        let mut world = World::new();
        let ball = spawn_sphere(&mut world, Point3::new(0.0, 10.0, 0.0), 0.5);

        let mut physics = PhysicsSystem::new();
        physics.set_simulation_enabled(false);
        physics.update(&mut world, 1.0);

        assert_eq!(physics.step_count(), 0);
        assert_eq!(world.transforms.get(ball).unwrap().position.y, 10.0);

        // Re-enabling does not replay the disabled time.
        physics.set_simulation_enabled(true);
        physics.update(&mut world, DT);
        assert_eq!(physics.step_count(), 1);
    }

    #[test]
    fn test_gravity_accelerates_dynamic_bodies() {
        let mut world = World::new();
        let ball = spawn_sphere(&mut world, Point3::new(0.0, 100.0, 0.0), 0.5);

        let mut physics = PhysicsSystem::new();
        physics.update(&mut world, 0.5);

        let body = world.bodies.get(ball).unwrap();
        assert!(body.velocity.y < -4.0);
        assert!(world.transforms.get(ball).unwrap().position.y < 100.0);
    }

    #[test]
    fn test_static_and_kinematic_immovable() {
        let mut world = World::new();
        let floor = spawn_static_box(&mut world, Point3::origin(), Vector3::new(5.0, 0.5, 5.0));

        let anchor = world.spawn(Point3::new(0.0, 3.0, 0.0));
        world.bodies.insert(anchor, RigidBody::kinematic());
        world
            .colliders
            .insert(anchor, Collider::new(ColliderShape::sphere(0.5)));

        let mut physics = PhysicsSystem::new();
        for _ in 0..120 {
            // Forces and impulses are no-ops for these body types.
            world
                .bodies
                .get_mut(floor)
                .unwrap()
                .apply_force(Vector3::new(0.0, 1000.0, 0.0));
            world
                .bodies
                .get_mut(anchor)
                .unwrap()
                .apply_impulse(Vector3::new(50.0, 0.0, 0.0));
            physics.update(&mut world, DT);
        }

        assert_eq!(world.transforms.get(floor).unwrap().position, Point3::origin());
        assert_eq!(world.bodies.get(floor).unwrap().velocity, Vector3::zeros());
        assert_eq!(
            world.transforms.get(anchor).unwrap().position,
            Point3::new(0.0, 3.0, 0.0)
        );
        assert_eq!(world.bodies.get(anchor).unwrap().velocity, Vector3::zeros());
    }

    #[test]
    fn test_sphere_lands_on_static_box() {
        let mut world = World::new();
        // Floor first so it is entity A in collision events.
        let floor = spawn_static_box(&mut world, Point3::origin(), Vector3::new(5.0, 0.5, 5.0));
        let ball = spawn_sphere(&mut world, Point3::new(0.0, 1.0, 0.0), 0.5);

        let mut physics = PhysicsSystem::new();

        let mut hit_step = None;
        for step in 0..120 {
            physics.update(&mut world, DT);
            if !physics.collision_events().is_empty() {
                hit_step = Some(step);
                break;
            }
        }
        assert!(hit_step.is_some(), "sphere never reached the floor");

        let event = &physics.collision_events()[0];
        assert!(event.involves(floor));
        assert!(event.involves(ball));
        assert!(!event.is_trigger_event);

        let contact = &event.contacts[0];
        assert!(contact.penetration > 0.0);
        // Floor is entity A, so the normal points up toward the sphere.
        assert_eq!(event.entity_a, floor);
        assert_relative_eq!(contact.normal.y, 1.0, epsilon = 1e-9);

        // No net sinking through the floor after the solve.
        assert!(world.bodies.get(ball).unwrap().velocity.y >= -1e-6);
    }

    #[test]
    fn test_overlapping_spheres_separate() {
        // Post-solve relative normal velocity must be non-negative for a
        // range of penetration depths.
        for &depth in &[0.05, 0.1, 0.2, 0.3, 0.4] {
            let mut world = World::new();
            let a = spawn_sphere(&mut world, Point3::origin(), 0.5);
            let b = spawn_sphere(&mut world, Point3::new(1.0 - depth, 0.0, 0.0), 0.5);

            let mut physics = PhysicsSystem::new();
            physics.set_gravity(Vector3::zeros());
            physics.update(&mut world, DT);

            assert_eq!(physics.collision_events().len(), 1);

            let va = world.bodies.get(a).unwrap().velocity;
            let vb = world.bodies.get(b).unwrap().velocity;
            let relative_normal_velocity = (vb - va).dot(&Vector3::x());
            assert!(
                relative_normal_velocity >= -1e-9,
                "still approaching at depth {depth}: {relative_normal_velocity}"
            );
        }
    }

    #[test]
    fn test_trigger_reports_but_does_not_resolve() {
        let mut world = World::new();
        let zone = world.spawn(Point3::origin());
        world.bodies.insert(zone, RigidBody::fixed());
        world
            .colliders
            .insert(zone, Collider::new(ColliderShape::sphere(1.0)).as_trigger());

        let ball = spawn_sphere(&mut world, Point3::new(0.5, 0.0, 0.0), 0.5);
        world.bodies.get_mut(ball).unwrap().velocity = Vector3::new(-1.0, 0.0, 0.0);

        let mut physics = PhysicsSystem::new();
        physics.set_gravity(Vector3::zeros());
        physics.update(&mut world, DT);

        let events = physics.collision_events();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_trigger_event);
        // The solver left the overlapping body's motion alone (damping only).
        let vx = world.bodies.get(ball).unwrap().velocity.x;
        assert_relative_eq!(vx, -1.0 * (1.0 - 0.1f64).powf(DT), epsilon = 1e-9);
    }

    #[test]
    fn test_sleep_activation_and_wake() {
        let mut world = World::new();
        let ball = spawn_sphere(&mut world, Point3::origin(), 0.5);

        let mut physics = PhysicsSystem::new();
        physics.set_gravity(Vector3::zeros());

        // At rest below the energy threshold for over half a second.
        physics.update(&mut world, 0.6);
        assert!(world.bodies.get(ball).unwrap().is_sleeping);
        assert_eq!(world.bodies.get(ball).unwrap().velocity, Vector3::zeros());

        // Stays asleep indefinitely without outside disturbance.
        physics.update(&mut world, 1.0);
        assert!(world.bodies.get(ball).unwrap().is_sleeping);

        // An impulse wakes it and it stays awake while moving.
        world
            .bodies
            .get_mut(ball)
            .unwrap()
            .apply_impulse(Vector3::new(1.0, 0.0, 0.0));
        assert!(!world.bodies.get(ball).unwrap().is_sleeping);

        physics.update(&mut world, 0.6);
        assert!(!world.bodies.get(ball).unwrap().is_sleeping);
    }

    #[test]
    fn test_sleep_heuristic_ignores_inertia() {
        // The sleep energy uses raw |ω|², so a slowly tumbling body with a
        // large inertia tensor still sleeps even though ωᵀIω would exceed
        // the threshold.
        let mut world = World::new();
        let ball = spawn_sphere(&mut world, Point3::origin(), 0.5);
        {
            let body = world.bodies.get_mut(ball).unwrap();
            body.angular_velocity = Vector3::new(0.0, 0.1, 0.0);
            body.inertia_tensor = nalgebra::Matrix3::from_diagonal(&Vector3::repeat(1e4));
            body.angular_damping = 0.0;
        }

        let mut physics = PhysicsSystem::new();
        physics.set_gravity(Vector3::zeros());
        physics.update(&mut world, 0.6);

        assert!(world.bodies.get(ball).unwrap().is_sleeping);
    }

    #[test]
    fn test_sleeping_body_skips_integration() {
        let mut world = World::new();
        let ball = spawn_sphere(&mut world, Point3::new(0.0, 5.0, 0.0), 0.5);
        world.bodies.get_mut(ball).unwrap().is_sleeping = true;
        world.bodies.get_mut(ball).unwrap().sleep_timer = 1.0;

        let mut physics = PhysicsSystem::new();
        physics.update(&mut world, 0.5);

        // Gravity never touched it.
        assert_eq!(
            world.transforms.get(ball).unwrap().position,
            Point3::new(0.0, 5.0, 0.0)
        );
        assert_eq!(world.bodies.get(ball).unwrap().velocity, Vector3::zeros());
    }

    #[test]
    fn test_velocity_clamped_to_constants() {
        let mut world = World::new();
        let ball = spawn_sphere(&mut world, Point3::origin(), 0.5);
        world.bodies.get_mut(ball).unwrap().linear_damping = 0.0;

        let mut physics = PhysicsSystem::new();
        physics.set_gravity(Vector3::zeros());
        physics.set_physics_constants(PhysicsConstants {
            max_linear_velocity: 5.0,
            ..PhysicsConstants::default()
        });

        world.bodies.get_mut(ball).unwrap().velocity = Vector3::new(100.0, 0.0, 0.0);
        physics.update(&mut world, DT);

        let velocity = world.bodies.get(ball).unwrap().velocity;
        assert_relative_eq!(velocity.norm(), 5.0, epsilon = 1e-9);
        // Direction preserved.
        assert_relative_eq!(velocity.x, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotation_integration_renormalizes() {
        let mut world = World::new();
        let ball = spawn_sphere(&mut world, Point3::origin(), 0.5);
        {
            let body = world.bodies.get_mut(ball).unwrap();
            body.angular_velocity = Vector3::new(0.0, 0.0, 3.0);
            body.angular_damping = 0.0;
        }

        let mut physics = PhysicsSystem::new();
        physics.set_gravity(Vector3::zeros());
        physics.update(&mut world, 0.25);

        let rotation = world.transforms.get(ball).unwrap().rotation;
        assert_relative_eq!(rotation.norm(), 1.0, epsilon = 1e-9);
        // Rotated a noticeable amount around Z.
        assert!(rotation.angle() > 0.5);
    }

    #[test]
    fn test_raycast_hits_nearest_sphere() {
        let mut world = World::new();
        let near = spawn_sphere(&mut world, Point3::new(5.0, 0.0, 0.0), 1.0);
        let _far = spawn_sphere(&mut world, Point3::new(12.0, 0.0, 0.0), 1.0);

        let physics = PhysicsSystem::new();
        let hit = physics
            .raycast(&world, Point3::origin(), Vector3::x(), 100.0)
            .unwrap();

        assert_eq!(hit.entity, near);
        assert_relative_eq!(hit.distance, 4.0, epsilon = 1e-9);
        assert_relative_eq!(hit.normal.x, -1.0, epsilon = 1e-9);

        let all = physics.raycast_all(&world, Point3::origin(), Vector3::x(), 100.0);
        assert_eq!(all.len(), 2);
        assert!(all[0].distance < all[1].distance);
    }

    #[test]
    fn test_raycast_misses_and_zero_direction() {
        let mut world = World::new();
        spawn_sphere(&mut world, Point3::new(0.0, 10.0, 0.0), 1.0);

        let physics = PhysicsSystem::new();
        assert!(physics
            .raycast(&world, Point3::origin(), Vector3::x(), 100.0)
            .is_none());
        assert!(physics
            .raycast(&world, Point3::origin(), Vector3::zeros(), 100.0)
            .is_none());
    }

    #[test]
    fn test_raycast_box_face_normal() {
        let mut world = World::new();
        let wall = spawn_static_box(
            &mut world,
            Point3::new(10.0, 0.0, 0.0),
            Vector3::new(1.0, 4.0, 4.0),
        );

        let physics = PhysicsSystem::new();
        let hit = physics
            .raycast(&world, Point3::origin(), Vector3::x(), 100.0)
            .unwrap();

        assert_eq!(hit.entity, wall);
        assert_relative_eq!(hit.distance, 9.0, epsilon = 1e-9);
        assert_relative_eq!(hit.normal.x, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_overlap_queries() {
        let mut world = World::new();
        let a = spawn_sphere(&mut world, Point3::origin(), 0.5);
        let b = spawn_sphere(&mut world, Point3::new(3.0, 0.0, 0.0), 0.5);
        let far = spawn_sphere(&mut world, Point3::new(50.0, 0.0, 0.0), 0.5);

        let physics = PhysicsSystem::new();

        let near = physics.overlap_sphere(&world, Point3::origin(), 4.0);
        assert!(near.contains(&a));
        assert!(near.contains(&b));
        assert!(!near.contains(&far));

        let boxed = physics.overlap_box(
            &world,
            &Aabb::from_center(Point3::new(3.0, 0.0, 0.0), Vector3::repeat(1.0)),
        );
        assert_eq!(boxed, vec![b]);
    }

    #[test]
    fn test_collision_events_cleared_each_step() {
        let mut world = World::new();
        spawn_static_box(&mut world, Point3::origin(), Vector3::new(5.0, 0.5, 5.0));
        spawn_sphere(&mut world, Point3::new(0.0, 0.8, 0.0), 0.5);

        let mut physics = PhysicsSystem::new();
        physics.update(&mut world, DT);
        assert!(!physics.collision_events().is_empty());

        physics.clear_collision_events();
        assert!(physics.collision_events().is_empty());
    }

    #[test]
    fn test_ballistics_slows_projectile() {
        let mut world = World::new();
        let shell = world.spawn(Point3::origin());
        let mut body = RigidBody::dynamic(1.0);
        body.velocity = Vector3::new(50.0, 0.0, 0.0);
        body.linear_damping = 0.0;
        world.bodies.insert(shell, body);
        world.projectiles.insert(
            shell,
            Projectile {
                cross_sectional_area: 0.1,
                ..Projectile::default()
            },
        );

        let mut physics = PhysicsSystem::new();
        physics.set_gravity(Vector3::zeros());
        let ballistics = BallisticsSystem::new();

        for _ in 0..60 {
            ballistics.update(&mut world);
            physics.update(&mut world, DT);
        }

        let vx = world.bodies.get(shell).unwrap().velocity.x;
        assert!(vx > 0.0);
        assert!(vx < 50.0);
    }
}
