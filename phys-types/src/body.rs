//! Rigid-body component: mass, velocity, accumulated forces, sleep state.

use nalgebra::{Matrix3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a body participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BodyType {
    /// Never moves; infinite mass.
    Static,
    /// Moved externally; not affected by forces.
    Kinematic,
    /// Affected by forces and gravity.
    #[default]
    Dynamic,
}

/// Surface material properties used when resolving contacts.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Material {
    /// Coulomb friction coefficient (dimensionless, ≥ 0).
    pub friction: f64,
    /// Coefficient of restitution (bounciness) in [0, 1].
    pub restitution: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.3,
        }
    }
}

impl Material {
    /// Create a material with the given friction and restitution.
    #[must_use]
    pub fn new(friction: f64, restitution: f64) -> Self {
        Self {
            friction: friction.max(0.0),
            restitution: restitution.clamp(0.0, 1.0),
        }
    }
}

/// Per-entity rigid-body state: mass properties, velocities, force
/// accumulators, and sleep bookkeeping.
///
/// The `mass`/`inverse_mass` pair is kept consistent through [`set_mass`]
/// and [`set_body_type`]: `inverse_mass == 1/mass` for positive mass and
/// `0` otherwise, so immovable bodies never require division-by-infinity
/// handling downstream.
///
/// Force and torque accumulators collect inputs between steps and are
/// zeroed by the simulation loop after velocity integration.
///
/// [`set_mass`]: RigidBody::set_mass
/// [`set_body_type`]: RigidBody::set_body_type
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidBody {
    /// How this body participates in the simulation.
    pub body_type: BodyType,
    /// Mass in kg. Zero for Static/Kinematic bodies.
    pub mass: f64,
    /// Reciprocal mass; zero when mass is zero.
    pub inverse_mass: f64,
    /// Linear velocity in world coordinates (m/s).
    pub velocity: Vector3<f64>,
    /// Angular velocity in world coordinates (rad/s).
    pub angular_velocity: Vector3<f64>,
    /// Accumulated force (N), cleared each step.
    pub force: Vector3<f64>,
    /// Accumulated torque (N·m), cleared each step.
    pub torque: Vector3<f64>,
    /// Center of mass offset from the entity origin, local coordinates.
    pub center_of_mass: Vector3<f64>,
    /// Inertia tensor (kg·m²), diagonal box approximation.
    pub inertia_tensor: Matrix3<f64>,
    /// Inverse inertia tensor; zero entries where inertia is zero.
    pub inverse_inertia_tensor: Matrix3<f64>,
    /// Exponential linear velocity decay factor in [0, 1).
    pub linear_damping: f64,
    /// Exponential angular velocity decay factor in [0, 1).
    pub angular_damping: f64,
    /// Contact material.
    pub material: Material,
    /// Whether the body is currently asleep (excluded from integration).
    pub is_sleeping: bool,
    /// Seconds of continuously low kinetic energy accumulated so far.
    pub sleep_timer: f64,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            body_type: BodyType::Dynamic,
            mass: 1.0,
            inverse_mass: 1.0,
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
            center_of_mass: Vector3::zeros(),
            inertia_tensor: Matrix3::identity(),
            inverse_inertia_tensor: Matrix3::identity(),
            linear_damping: 0.1,
            angular_damping: 0.1,
            material: Material::default(),
            is_sleeping: false,
            sleep_timer: 0.0,
        }
    }
}

impl RigidBody {
    /// Create a dynamic body with the given mass.
    #[must_use]
    pub fn dynamic(mass: f64) -> Self {
        let mut body = Self::default();
        body.set_mass(mass);
        body
    }

    /// Create a static (immovable) body.
    #[must_use]
    pub fn fixed() -> Self {
        let mut body = Self::default();
        body.set_body_type(BodyType::Static);
        body
    }

    /// Create a kinematic body (externally driven, unaffected by forces).
    #[must_use]
    pub fn kinematic() -> Self {
        let mut body = Self::default();
        body.set_body_type(BodyType::Kinematic);
        body
    }

    /// Set the body type, resetting mass and velocity fields as required.
    ///
    /// Static bodies get zero mass and zero velocities; kinematic bodies
    /// get zero mass but keep their externally driven velocities; switching
    /// to dynamic restores a unit mass if the current mass is non-positive.
    pub fn set_body_type(&mut self, body_type: BodyType) {
        self.body_type = body_type;

        match body_type {
            BodyType::Static => {
                self.mass = 0.0;
                self.inverse_mass = 0.0;
                self.velocity = Vector3::zeros();
                self.angular_velocity = Vector3::zeros();
            }
            BodyType::Kinematic => {
                self.mass = 0.0;
                self.inverse_mass = 0.0;
            }
            BodyType::Dynamic => {
                if self.mass <= 0.0 {
                    self.set_mass(1.0);
                }
            }
        }
    }

    /// Set the mass, keeping `inverse_mass` consistent.
    ///
    /// Negative input is clamped to zero; zero mass yields zero inverse.
    pub fn set_mass(&mut self, mass: f64) {
        self.mass = mass.max(0.0);
        self.inverse_mass = if self.mass > 0.0 { 1.0 / self.mass } else { 0.0 };
    }

    /// Accumulate a force at the center of mass.
    ///
    /// No-op for non-dynamic bodies. Wakes the body.
    pub fn apply_force(&mut self, force: Vector3<f64>) {
        if self.body_type == BodyType::Dynamic {
            self.force += force;
            self.wake_up();
        }
    }

    /// Accumulate a force applied at a local-space position, deriving the
    /// torque from the offset to the center of mass.
    pub fn apply_force_at_point(&mut self, force: Vector3<f64>, point: Vector3<f64>) {
        if self.body_type == BodyType::Dynamic {
            self.apply_force(force);
            let r = point - self.center_of_mass;
            self.apply_torque(r.cross(&force));
        }
    }

    /// Accumulate a torque.
    ///
    /// No-op for non-dynamic bodies. Wakes the body.
    pub fn apply_torque(&mut self, torque: Vector3<f64>) {
        if self.body_type == BodyType::Dynamic {
            self.torque += torque;
            self.wake_up();
        }
    }

    /// Apply an instantaneous impulse at the center of mass.
    ///
    /// Changes velocity directly: `v += j * inverse_mass`. No-op for
    /// non-dynamic bodies. Wakes the body.
    pub fn apply_impulse(&mut self, impulse: Vector3<f64>) {
        if self.body_type == BodyType::Dynamic {
            self.velocity += impulse * self.inverse_mass;
            self.wake_up();
        }
    }

    /// Apply an instantaneous impulse at a local-space position, adding the
    /// induced angular velocity change.
    pub fn apply_impulse_at_point(&mut self, impulse: Vector3<f64>, point: Vector3<f64>) {
        if self.body_type == BodyType::Dynamic {
            self.apply_impulse(impulse);
            let r = point - self.center_of_mass;
            self.angular_velocity += self.inverse_inertia_tensor * r.cross(&impulse);
        }
    }

    /// Wake the body: clear the sleeping flag and reset the sleep timer.
    pub fn wake_up(&mut self) {
        self.is_sleeping = false;
        self.sleep_timer = 0.0;
    }

    /// Compute the diagonal inertia tensor of a solid box with the given
    /// half-extents, and its inverse.
    ///
    /// `I_xx = m/12 · (h² + d²)` and cyclic permutations, where w/h/d are
    /// the full box dimensions. Zero diagonal entries (zero mass or a flat
    /// box) invert to zero.
    pub fn set_inertia_from_aabb(&mut self, half_extents: Vector3<f64>) {
        let size = half_extents * 2.0;
        let factor = self.mass / 12.0;

        let diag = Vector3::new(
            factor * (size.y * size.y + size.z * size.z),
            factor * (size.x * size.x + size.z * size.z),
            factor * (size.x * size.x + size.y * size.y),
        );
        self.inertia_tensor = Matrix3::from_diagonal(&diag);

        let inv = diag.map(|i| if i > 0.0 { 1.0 / i } else { 0.0 });
        self.inverse_inertia_tensor = Matrix3::from_diagonal(&inv);
    }

    /// Kinetic energy used by the sleep heuristic.
    ///
    /// The angular term uses the raw angular speed squared, not `ωᵀIω`.
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.norm_squared()
            + 0.5 * self.angular_velocity.norm_squared()
    }

    /// Check if the body state contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.velocity.iter().all(|x| x.is_finite())
            && self.angular_velocity.iter().all(|x| x.is_finite())
            && self.force.iter().all(|x| x.is_finite())
            && self.torque.iter().all(|x| x.is_finite())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mass_inverse_mass_invariant() {
        let mut body = RigidBody::default();

        body.set_mass(2.0);
        assert_relative_eq!(body.inverse_mass, 0.5, epsilon = 1e-12);

        body.set_mass(0.0);
        assert_eq!(body.inverse_mass, 0.0);

        body.set_mass(-5.0);
        assert_eq!(body.mass, 0.0);
        assert_eq!(body.inverse_mass, 0.0);
    }

    #[test]
    fn test_static_zeroes_mass_and_velocity() {
        let mut body = RigidBody::dynamic(3.0);
        body.velocity = Vector3::new(1.0, 2.0, 3.0);
        body.angular_velocity = Vector3::new(0.1, 0.0, 0.0);

        body.set_body_type(BodyType::Static);
        assert_eq!(body.mass, 0.0);
        assert_eq!(body.inverse_mass, 0.0);
        assert_eq!(body.velocity, Vector3::zeros());
        assert_eq!(body.angular_velocity, Vector3::zeros());
    }

    #[test]
    fn test_kinematic_keeps_velocity() {
        let mut body = RigidBody::dynamic(3.0);
        body.velocity = Vector3::new(1.0, 0.0, 0.0);

        body.set_body_type(BodyType::Kinematic);
        assert_eq!(body.mass, 0.0);
        assert_eq!(body.velocity, Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_dynamic_restores_unit_mass() {
        let mut body = RigidBody::fixed();
        body.set_body_type(BodyType::Dynamic);
        assert_eq!(body.mass, 1.0);
        assert_eq!(body.inverse_mass, 1.0);
    }

    #[test]
    fn test_force_ignored_for_static() {
        let mut body = RigidBody::fixed();
        body.apply_force(Vector3::new(100.0, 0.0, 0.0));
        assert_eq!(body.force, Vector3::zeros());
    }

    #[test]
    fn test_impulse_scales_by_inverse_mass() {
        let mut body = RigidBody::dynamic(2.0);
        body.apply_impulse(Vector3::new(4.0, 0.0, 0.0));
        assert_relative_eq!(body.velocity.x, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_impulse_wakes_sleeping_body() {
        let mut body = RigidBody::dynamic(1.0);
        body.is_sleeping = true;
        body.sleep_timer = 0.7;

        body.apply_impulse(Vector3::new(0.1, 0.0, 0.0));
        assert!(!body.is_sleeping);
        assert_eq!(body.sleep_timer, 0.0);
    }

    #[test]
    fn test_force_at_point_produces_torque() {
        let mut body = RigidBody::dynamic(1.0);
        // Force +Y at a point offset +X from the COM twists around +Z.
        body.apply_force_at_point(Vector3::new(0.0, 1.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(body.torque.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_box_inertia() {
        let mut body = RigidBody::dynamic(12.0);
        body.set_inertia_from_aabb(Vector3::new(0.5, 0.5, 0.5));
        // Unit cube, mass 12: I = 12/12 * (1 + 1) = 2 on each diagonal.
        assert_relative_eq!(body.inertia_tensor[(0, 0)], 2.0, epsilon = 1e-12);
        assert_relative_eq!(body.inverse_inertia_tensor[(0, 0)], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_box_inertia_inverts_to_zero() {
        let mut body = RigidBody::default();
        body.set_mass(0.0);
        body.set_inertia_from_aabb(Vector3::new(0.5, 0.5, 0.5));
        assert_eq!(body.inverse_inertia_tensor[(0, 0)], 0.0);
    }

    #[test]
    fn test_kinetic_energy_ignores_inertia() {
        let mut body = RigidBody::dynamic(2.0);
        body.velocity = Vector3::new(1.0, 0.0, 0.0);
        body.angular_velocity = Vector3::new(0.0, 2.0, 0.0);
        // 0.5*2*1 + 0.5*4 = 3, regardless of the inertia tensor.
        assert_relative_eq!(body.kinetic_energy(), 3.0, epsilon = 1e-12);
    }
}
