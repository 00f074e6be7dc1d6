//! Collider shape descriptors.

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Geometric shape of a collider.
///
/// Each variant carries its own parameters, so a sphere radius can never be
/// misread as a box half-extent.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ColliderShape {
    /// Axis-aligned box described by half-extents.
    Box {
        /// Half-extent along each axis.
        half_extents: Vector3<f64>,
    },
    /// Sphere.
    Sphere {
        /// Sphere radius.
        radius: f64,
    },
    /// Vertical capsule (Y axis): a cylinder of the given half-height with
    /// hemispherical caps of the given radius.
    Capsule {
        /// Cap radius.
        radius: f64,
        /// Half-height of the cylindrical section.
        half_height: f64,
    },
}

impl ColliderShape {
    /// Create a box shape from half-extents.
    #[must_use]
    pub fn box_shape(half_extents: Vector3<f64>) -> Self {
        Self::Box { half_extents }
    }

    /// Create a sphere shape.
    #[must_use]
    pub fn sphere(radius: f64) -> Self {
        Self::Sphere { radius }
    }

    /// Create a capsule shape.
    #[must_use]
    pub fn capsule(radius: f64, half_height: f64) -> Self {
        Self::Capsule {
            radius,
            half_height,
        }
    }

    /// World-space AABB half-extents of this shape (translation-only
    /// transforms; boxes are treated as world-aligned).
    #[must_use]
    pub fn aabb_half_extents(&self) -> Vector3<f64> {
        match *self {
            Self::Box { half_extents } => half_extents,
            Self::Sphere { radius } => Vector3::new(radius, radius, radius),
            Self::Capsule {
                radius,
                half_height,
            } => Vector3::new(radius, radius + half_height, radius),
        }
    }
}

/// Collision geometry attached to an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Collider {
    /// The collider's shape.
    pub shape: ColliderShape,
    /// Local-space offset of the shape center from the entity origin.
    pub offset: Vector3<f64>,
    /// Trigger colliders report events but are excluded from the solver.
    pub is_trigger: bool,
}

impl Collider {
    /// Create a collider with the given shape, centered on the entity.
    #[must_use]
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            offset: Vector3::zeros(),
            is_trigger: false,
        }
    }

    /// Set the local center offset.
    #[must_use]
    pub fn with_offset(mut self, offset: Vector3<f64>) -> Self {
        self.offset = offset;
        self
    }

    /// Mark this collider as a trigger.
    #[must_use]
    pub fn as_trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }
}
