//! Iterative sequential-impulse contact solver.
//!
//! Each step, the solver runs a fixed number of iterations over all
//! non-trigger collision events. Fixed iteration counts keep the cost per
//! step predictable and the results deterministic for a given event order.
//!
//! Per contact and iteration, the normal impulse is accumulated with a
//! non-negative clamp and only the *delta* between the new and old
//! accumulated value is applied, so repeated iterations converge instead of
//! double-applying. A Baumgarte term proportional to `penetration / dt`
//! bleeds residual interpenetration out at the velocity level; there is no
//! separate position-projection pass. Friction follows each normal update,
//! clamped to the Coulomb cone of the accumulated normal impulse.
//!
//! The solver writes body velocities only. Static and kinematic bodies have
//! zero inverse mass, so their velocities are naturally unaffected.

use phys_types::{CollisionEvent, ContactPoint, PhysicsConstants, RigidBody};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::store::World;

/// Contacts with a combined inverse mass below this are skipped (both
/// bodies immovable).
const EFFECTIVE_MASS_EPSILON: f64 = 1e-6;

/// Tangential speeds below this produce no friction impulse.
const TANGENT_SPEED_EPSILON: f64 = 1e-6;

/// Configuration for the contact solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Number of solver iterations per step.
    ///
    /// More iterations propagate impulses further through coupled contact
    /// chains at a linear cost increase.
    pub iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self { iterations: 10 }
    }
}

impl SolverConfig {
    /// Create a config with the given iteration count.
    #[must_use]
    pub fn with_iterations(iterations: usize) -> Self {
        Self { iterations }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`phys_types::PhysicsError::InvalidConfig`] for a zero
    /// iteration count.
    pub fn validate(&self) -> phys_types::Result<()> {
        if self.iterations == 0 {
            return Err(phys_types::PhysicsError::invalid_config(
                "solver iterations must be at least 1",
            ));
        }
        Ok(())
    }
}

/// The sequential-impulse contact solver.
#[derive(Debug, Clone, Default)]
pub struct ContactSolver {
    config: SolverConfig,
}

impl ContactSolver {
    /// Create a solver with the given configuration.
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Get the solver configuration.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Resolve all non-trigger events against the world's body velocities.
    ///
    /// Events whose entities lack a rigid body are skipped. Impulse
    /// accumulators on the contacts persist across iterations within this
    /// call only; callers rebuild contacts each step.
    pub fn solve(
        &self,
        events: &mut [CollisionEvent],
        world: &mut World,
        constants: &PhysicsConstants,
        dt: f64,
    ) {
        if events.is_empty() {
            return;
        }

        for _ in 0..self.config.iterations {
            for event in events.iter_mut() {
                if event.is_trigger_event {
                    continue;
                }

                let Some((body_a, body_b)) =
                    world.bodies.get2_mut(event.entity_a, event.entity_b)
                else {
                    continue;
                };

                for contact in &mut event.contacts {
                    Self::solve_contact(body_a, body_b, contact, constants, dt);
                }
            }
        }

        debug!(
            events = events.len(),
            iterations = self.config.iterations,
            "contact solve complete"
        );
    }

    /// One solver iteration for one contact.
    fn solve_contact(
        body_a: &mut RigidBody,
        body_b: &mut RigidBody,
        contact: &mut ContactPoint,
        constants: &PhysicsConstants,
        dt: f64,
    ) {
        let effective_mass = body_a.inverse_mass + body_b.inverse_mass;
        if effective_mass < EFFECTIVE_MASS_EPSILON {
            return;
        }

        // --- Normal impulse ---
        let relative_velocity = body_b.velocity - body_a.velocity;
        let normal_velocity = relative_velocity.dot(&contact.normal);

        let restitution =
            (body_a.material.restitution * body_b.material.restitution).sqrt();

        // Velocity-level target plus Baumgarte positional correction.
        let bias = constants.baumgarte_factor * contact.penetration / dt;
        let magnitude = (-(1.0 + restitution) * normal_velocity + bias) / effective_mass;

        // Accumulate, clamp, and apply only the delta: the accumulator may
        // only push bodies apart, never pull them together.
        let previous = contact.normal_impulse;
        let accumulated = (previous + magnitude).max(0.0);
        let delta = accumulated - previous;
        contact.normal_impulse = accumulated;

        let impulse = contact.normal * delta;
        body_a.velocity -= impulse * body_a.inverse_mass;
        body_b.velocity += impulse * body_b.inverse_mass;

        // --- Friction impulse ---
        let relative_velocity = body_b.velocity - body_a.velocity;
        let tangent_velocity =
            relative_velocity - relative_velocity.dot(&contact.normal) * contact.normal;
        let tangent_speed = tangent_velocity.norm();
        if tangent_speed <= TANGENT_SPEED_EPSILON {
            return;
        }

        let tangent = tangent_velocity / tangent_speed;
        let friction = (body_a.material.friction * body_b.material.friction).sqrt();

        let mut tangent_magnitude = -relative_velocity.dot(&tangent) / effective_mass;

        // Coulomb cone: friction cannot exceed μ times the accumulated
        // normal impulse.
        let max_friction = friction * contact.normal_impulse;
        tangent_magnitude = tangent_magnitude.clamp(-max_friction, max_friction);
        contact.tangent_impulse[0] += tangent_magnitude;

        let friction_impulse = tangent * tangent_magnitude;
        body_a.velocity -= friction_impulse * body_a.inverse_mass;
        body_b.velocity += friction_impulse * body_b.inverse_mass;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};
    use phys_types::{Entity, Material};

    fn two_body_world(body_a: RigidBody, body_b: RigidBody) -> (World, Entity, Entity) {
        let mut world = World::new();
        let a = world.spawn(Point3::origin());
        let b = world.spawn(Point3::new(1.0, 0.0, 0.0));
        world.bodies.insert(a, body_a);
        world.bodies.insert(b, body_b);
        (world, a, b)
    }

    fn head_on_event(a: Entity, b: Entity, penetration: f64) -> CollisionEvent {
        CollisionEvent::new(
            a,
            b,
            ContactPoint::new(Point3::new(0.5, 0.0, 0.0), Vector3::x(), penetration),
            false,
        )
    }

    #[test]
    fn test_head_on_collision_separates() {
        let mut body_a = RigidBody::dynamic(1.0);
        body_a.velocity = Vector3::new(1.0, 0.0, 0.0);
        let mut body_b = RigidBody::dynamic(1.0);
        body_b.velocity = Vector3::new(-1.0, 0.0, 0.0);

        let (mut world, a, b) = two_body_world(body_a, body_b);
        let mut events = vec![head_on_event(a, b, 0.01)];

        ContactSolver::default().solve(
            &mut events,
            &mut world,
            &PhysicsConstants::default(),
            1.0 / 60.0,
        );

        let va = world.bodies.get(a).unwrap().velocity;
        let vb = world.bodies.get(b).unwrap().velocity;
        // Post-solve relative normal velocity must be non-negative.
        assert!((vb - va).x >= -1e-9);
        // Momentum is conserved for an equal-mass symmetric pair.
        assert_relative_eq!(va.x + vb.x, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_normal_impulse_never_negative() {
        // Bodies already separating: the accumulated impulse stays zero and
        // no velocity change is applied.
        let mut body_a = RigidBody::dynamic(1.0);
        body_a.velocity = Vector3::new(-1.0, 0.0, 0.0);
        let mut body_b = RigidBody::dynamic(1.0);
        body_b.velocity = Vector3::new(1.0, 0.0, 0.0);

        let (mut world, a, b) = two_body_world(body_a, body_b);
        let mut events = vec![head_on_event(a, b, 0.0)];

        ContactSolver::default().solve(
            &mut events,
            &mut world,
            &PhysicsConstants::default(),
            1.0 / 60.0,
        );

        assert_eq!(events[0].contacts[0].normal_impulse, 0.0);
        assert_relative_eq!(world.bodies.get(a).unwrap().velocity.x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(world.bodies.get(b).unwrap().velocity.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_trigger_events_skipped() {
        let mut body_a = RigidBody::dynamic(1.0);
        body_a.velocity = Vector3::new(1.0, 0.0, 0.0);
        let body_b = RigidBody::dynamic(1.0);

        let (mut world, a, b) = two_body_world(body_a, body_b);
        let mut event = head_on_event(a, b, 0.05);
        event.is_trigger_event = true;
        let mut events = vec![event];

        ContactSolver::default().solve(
            &mut events,
            &mut world,
            &PhysicsConstants::default(),
            1.0 / 60.0,
        );

        assert_relative_eq!(world.bodies.get(a).unwrap().velocity.x, 1.0, epsilon = 1e-12);
        assert_eq!(events[0].contacts[0].normal_impulse, 0.0);
    }

    #[test]
    fn test_both_static_skipped() {
        let (mut world, a, b) = two_body_world(RigidBody::fixed(), RigidBody::kinematic());
        let mut events = vec![head_on_event(a, b, 0.5)];

        ContactSolver::default().solve(
            &mut events,
            &mut world,
            &PhysicsConstants::default(),
            1.0 / 60.0,
        );

        assert_eq!(world.bodies.get(a).unwrap().velocity, Vector3::zeros());
        assert_eq!(world.bodies.get(b).unwrap().velocity, Vector3::zeros());
        assert_eq!(events[0].contacts[0].normal_impulse, 0.0);
    }

    #[test]
    fn test_static_velocity_untouched_against_dynamic() {
        let mut sphere = RigidBody::dynamic(1.0);
        sphere.velocity = Vector3::new(2.0, 0.0, 0.0);

        let (mut world, a, b) = two_body_world(sphere, RigidBody::fixed());
        let mut events = vec![head_on_event(a, b, 0.01)];

        ContactSolver::default().solve(
            &mut events,
            &mut world,
            &PhysicsConstants::default(),
            1.0 / 60.0,
        );

        // The static body never moves; the dynamic one rebounds.
        assert_eq!(world.bodies.get(b).unwrap().velocity, Vector3::zeros());
        assert!(world.bodies.get(a).unwrap().velocity.x <= 0.0);
    }

    #[test]
    fn test_baumgarte_pushes_resting_bodies_apart() {
        // At rest but interpenetrating: only the Baumgarte term acts.
        let (mut world, a, b) =
            two_body_world(RigidBody::dynamic(1.0), RigidBody::dynamic(1.0));
        let mut events = vec![head_on_event(a, b, 0.1)];

        ContactSolver::default().solve(
            &mut events,
            &mut world,
            &PhysicsConstants::default(),
            1.0 / 60.0,
        );

        // A is pushed against the normal, B along it.
        assert!(world.bodies.get(a).unwrap().velocity.x < 0.0);
        assert!(world.bodies.get(b).unwrap().velocity.x > 0.0);
    }

    #[test]
    fn test_friction_bounded_by_coulomb_cone() {
        // B slides tangentially (along Y) while penetrating along X.
        let mut slider = RigidBody::dynamic(1.0);
        slider.velocity = Vector3::new(-0.5, 3.0, 0.0);
        slider.material = Material::new(1.0, 0.0);
        let mut anchor = RigidBody::dynamic(1.0);
        anchor.material = Material::new(1.0, 0.0);

        let (mut world, a, b) = two_body_world(anchor, slider);
        let mut events = vec![head_on_event(a, b, 0.01)];

        ContactSolver::default().solve(
            &mut events,
            &mut world,
            &PhysicsConstants::default(),
            1.0 / 60.0,
        );

        let vb = world.bodies.get(b).unwrap().velocity;
        // Friction reduced the tangential speed but cannot reverse it
        // beyond zero given the cone bound.
        assert!(vb.y < 3.0);
        assert!(vb.y >= 0.0);
    }

    #[test]
    fn test_solver_deterministic() {
        let run = || {
            let mut body_a = RigidBody::dynamic(1.0);
            body_a.velocity = Vector3::new(0.7, 0.2, 0.0);
            let mut body_b = RigidBody::dynamic(2.0);
            body_b.velocity = Vector3::new(-0.3, 0.0, 0.1);

            let (mut world, a, b) = two_body_world(body_a, body_b);
            let mut events = vec![head_on_event(a, b, 0.02)];
            ContactSolver::default().solve(
                &mut events,
                &mut world,
                &PhysicsConstants::default(),
                1.0 / 60.0,
            );
            (
                world.bodies.get(a).unwrap().velocity,
                world.bodies.get(b).unwrap().velocity,
            )
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        assert!(SolverConfig::with_iterations(0).validate().is_err());
        assert!(SolverConfig::default().validate().is_ok());
    }
}
