//! Tunable simulation constants.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Constants read by every simulation step.
///
/// Owned by the simulation loop and settable at any time between steps;
/// there is no ambient global configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhysicsConstants {
    /// Linear speed cap (m/s). Velocities above this are clamped,
    /// preserving direction.
    pub max_linear_velocity: f64,
    /// Angular speed cap (rad/s).
    pub max_angular_velocity: f64,
    /// Baumgarte stabilization gain: fraction of residual penetration
    /// converted to corrective velocity per step.
    pub baumgarte_factor: f64,
    /// Kinetic energy below which a body accumulates sleep time.
    pub sleep_threshold: f64,
}

impl Default for PhysicsConstants {
    fn default() -> Self {
        Self {
            max_linear_velocity: 100.0,
            max_angular_velocity: 100.0,
            baumgarte_factor: 0.2,
            sleep_threshold: 0.01,
        }
    }
}

impl PhysicsConstants {
    /// Validate the constants.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PhysicsError::InvalidConfig`] if any cap is
    /// non-positive or the Baumgarte factor falls outside [0, 1].
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_linear_velocity <= 0.0 || !self.max_linear_velocity.is_finite() {
            return Err(crate::PhysicsError::invalid_config(
                "max_linear_velocity must be positive and finite",
            ));
        }
        if self.max_angular_velocity <= 0.0 || !self.max_angular_velocity.is_finite() {
            return Err(crate::PhysicsError::invalid_config(
                "max_angular_velocity must be positive and finite",
            ));
        }
        if !(0.0..=1.0).contains(&self.baumgarte_factor) {
            return Err(crate::PhysicsError::invalid_config(
                "baumgarte_factor must be in [0, 1]",
            ));
        }
        if self.sleep_threshold < 0.0 {
            return Err(crate::PhysicsError::invalid_config(
                "sleep_threshold cannot be negative",
            ));
        }
        Ok(())
    }
}
