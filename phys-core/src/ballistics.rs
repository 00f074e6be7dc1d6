//! Projectile aerodynamics: quadratic air drag with wind.
//!
//! Runs once per `update` call, outside the fixed-step loop, accumulating
//! drag forces through the normal force path so sleeping bodies wake and
//! non-dynamic bodies are unaffected.

use nalgebra::Vector3;
use phys_types::BodyType;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::store::World;

/// Air density at sea level (kg/m³).
const AIR_DENSITY: f64 = 1.225;

/// Aerodynamic properties of a projectile entity.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Projectile {
    /// Drag coefficient (0.47 for a sphere).
    pub drag_coefficient: f64,
    /// Cross-sectional area facing the airflow (m²).
    pub cross_sectional_area: f64,
    /// Whether wind and drag act on this projectile at all.
    pub affected_by_wind: bool,
}

impl Default for Projectile {
    fn default() -> Self {
        Self {
            drag_coefficient: 0.47,
            cross_sectional_area: 0.01,
            affected_by_wind: true,
        }
    }
}

/// Applies air resistance to projectile entities.
#[derive(Debug, Clone)]
pub struct BallisticsSystem {
    wind_velocity: Vector3<f64>,
    air_resistance_enabled: bool,
}

impl Default for BallisticsSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl BallisticsSystem {
    /// Create a ballistics system with still air.
    #[must_use]
    pub fn new() -> Self {
        Self {
            wind_velocity: Vector3::zeros(),
            air_resistance_enabled: true,
        }
    }

    /// Set the ambient wind velocity.
    pub fn set_wind_velocity(&mut self, wind: Vector3<f64>) {
        self.wind_velocity = wind;
    }

    /// Get the ambient wind velocity.
    #[must_use]
    pub fn wind_velocity(&self) -> Vector3<f64> {
        self.wind_velocity
    }

    /// Enable or disable air resistance.
    pub fn set_air_resistance_enabled(&mut self, enabled: bool) {
        self.air_resistance_enabled = enabled;
    }

    /// Whether air resistance is enabled.
    #[must_use]
    pub fn is_air_resistance_enabled(&self) -> bool {
        self.air_resistance_enabled
    }

    /// Accumulate drag forces on every projectile with a rigid body.
    ///
    /// Drag: `F = ½ · ρ · |v_rel|² · C_d · A`, opposing the wind-relative
    /// velocity. Near-zero relative speeds produce no force.
    pub fn update(&self, world: &mut World) {
        if !self.air_resistance_enabled {
            return;
        }

        let projectiles = &world.projectiles;
        let bodies = &mut world.bodies;

        for (entity, projectile) in projectiles.iter() {
            if !projectile.affected_by_wind {
                continue;
            }
            let Some(body) = bodies.get_mut(entity) else {
                continue;
            };
            if body.body_type != BodyType::Dynamic {
                continue;
            }

            let relative_velocity = body.velocity - self.wind_velocity;
            let speed = relative_velocity.norm();
            if speed <= 1e-6 {
                continue;
            }

            let magnitude = 0.5
                * AIR_DENSITY
                * speed
                * speed
                * projectile.drag_coefficient
                * projectile.cross_sectional_area;
            let drag = -relative_velocity / speed * magnitude;

            body.apply_force(drag);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;
    use phys_types::RigidBody;

    fn projectile_world(velocity: Vector3<f64>) -> (World, phys_types::Entity) {
        let mut world = World::new();
        let e = world.spawn(Point3::origin());
        let mut body = RigidBody::dynamic(1.0);
        body.velocity = velocity;
        world.bodies.insert(e, body);
        world.projectiles.insert(e, Projectile::default());
        (world, e)
    }

    #[test]
    fn test_drag_opposes_motion() {
        let (mut world, e) = projectile_world(Vector3::new(10.0, 0.0, 0.0));
        BallisticsSystem::new().update(&mut world);

        let force = world.bodies.get(e).unwrap().force;
        assert!(force.x < 0.0);
        assert_eq!(force.y, 0.0);

        // F = 0.5 * 1.225 * 100 * 0.47 * 0.01
        assert_relative_eq!(force.x, -0.5 * 1.225 * 100.0 * 0.47 * 0.01, epsilon = 1e-9);
    }

    #[test]
    fn test_wind_relative_velocity() {
        // Body at rest in a tailwind feels a forward push.
        let (mut world, e) = projectile_world(Vector3::zeros());
        let mut ballistics = BallisticsSystem::new();
        ballistics.set_wind_velocity(Vector3::new(5.0, 0.0, 0.0));
        ballistics.update(&mut world);

        assert!(world.bodies.get(e).unwrap().force.x > 0.0);
    }

    #[test]
    fn test_unaffected_projectile_feels_nothing() {
        let (mut world, e) = projectile_world(Vector3::new(10.0, 0.0, 0.0));
        world.projectiles.get_mut(e).unwrap().affected_by_wind = false;

        BallisticsSystem::new().update(&mut world);
        assert_eq!(world.bodies.get(e).unwrap().force, Vector3::zeros());
    }

    #[test]
    fn test_disabled_system_is_noop() {
        let (mut world, e) = projectile_world(Vector3::new(10.0, 0.0, 0.0));
        let mut ballistics = BallisticsSystem::new();
        ballistics.set_air_resistance_enabled(false);

        ballistics.update(&mut world);
        assert_eq!(world.bodies.get(e).unwrap().force, Vector3::zeros());
    }

    #[test]
    fn test_drag_wakes_sleeping_body() {
        let (mut world, e) = projectile_world(Vector3::new(10.0, 0.0, 0.0));
        world.bodies.get_mut(e).unwrap().is_sleeping = true;

        BallisticsSystem::new().update(&mut world);
        assert!(!world.bodies.get(e).unwrap().is_sleeping);
    }
}
