//! Error types for simulation operations.

use thiserror::Error;

/// Convenience alias for results carrying a [`PhysicsError`].
pub type Result<T> = std::result::Result<T, PhysicsError>;

/// Errors that can occur while configuring or mutating the simulation.
///
/// Stepping itself is non-throwing: degenerate numeric cases inside a step
/// are handled by guards, not errors. This type covers configuration
/// validation and handle-based mutation APIs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    /// Invalid entity referenced.
    #[error("invalid entity: {0}")]
    InvalidEntity(u64),

    /// Invalid fixed timestep.
    #[error("invalid timestep: {0} (must be positive and finite)")]
    InvalidTimestep(f64),

    /// Invalid mass value.
    #[error("invalid mass: {reason}")]
    InvalidMass {
        /// Description of what's wrong.
        reason: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// Simulation diverged (`NaN` or `Inf` detected).
    #[error("simulation diverged: {reason}")]
    Diverged {
        /// Description of what went wrong.
        reason: String,
    },
}

impl PhysicsError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid mass error.
    #[must_use]
    pub fn invalid_mass(reason: impl Into<String>) -> Self {
        Self::InvalidMass {
            reason: reason.into(),
        }
    }

    /// Create a diverged error.
    #[must_use]
    pub fn diverged(reason: impl Into<String>) -> Self {
        Self::Diverged {
            reason: reason.into(),
        }
    }

    /// Check if this is a divergence error.
    #[must_use]
    pub fn is_diverged(&self) -> bool {
        matches!(self, Self::Diverged { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PhysicsError::InvalidEntity(42);
        assert!(err.to_string().contains("42"));

        let err = PhysicsError::InvalidTimestep(-0.5);
        assert!(err.to_string().contains("-0.5"));

        let err = PhysicsError::diverged("NaN in velocity");
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn test_error_predicates() {
        assert!(PhysicsError::diverged("test").is_diverged());
        assert!(!PhysicsError::invalid_config("bad value").is_diverged());
    }
}
