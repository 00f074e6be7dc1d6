//! Core data types for the `phys` rigid-body simulation stack.
//!
//! This crate holds the leaf types shared by the collision and simulation
//! layers: the rigid-body component, collider shape descriptors, transient
//! contact records, tunable constants, and the error type. It contains no
//! algorithmic code and depends only on [`nalgebra`] (plus optional `serde`).
//!
//! # Layering
//!
//! ```text
//! phys-core       (simulation loop, solver, store)
//!    │
//! phys-collision  (broad phase, narrow phase)
//!    │
//! phys-types      (this crate)
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod body;
mod collider;
mod config;
mod contact;
mod error;

pub use body::{BodyType, Material, RigidBody};
pub use collider::{Collider, ColliderShape};
pub use config::PhysicsConstants;
pub use contact::{CollisionEvent, ContactPoint, Entity};
pub use error::{PhysicsError, Result};

// Re-export the math types that appear in public signatures.
pub use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};
