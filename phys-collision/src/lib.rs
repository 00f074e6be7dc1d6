//! Collision detection for the `phys` rigid-body stack.
//!
//! Two layers, run in sequence each simulation step:
//!
//! 1. **Broad phase** ([`broad_phase`]): cheap filtering that produces
//!    candidate entity pairs from axis-aligned bounding-box overlap. Both a
//!    brute-force O(n²) baseline and a sweep-and-prune implementation are
//!    provided behind the [`BroadPhase`] trait; they produce the same
//!    candidate set.
//! 2. **Narrow phase** ([`narrow_phase`]): exact shape-pair tests that turn
//!    a candidate pair into at most one [`phys_types::ContactPoint`].
//!
//! The contact normal convention throughout is that the normal points from
//! body A toward body B; dispatch flips results for swapped shape orders.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

pub mod broad_phase;
pub mod narrow_phase;

pub use broad_phase::{
    collider_aabb, Aabb, BroadPhase, BroadPhaseAlgorithm, BroadPhaseConfig, BroadPhaseDetector,
    BroadPhaseProxy, BruteForce, SweepAndPrune,
};
pub use narrow_phase::contact_for_pair;
