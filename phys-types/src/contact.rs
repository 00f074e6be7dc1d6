//! Transient per-step collision records.

use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Handle to an entity in the external component store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Entity(pub u64);

impl Entity {
    /// Create an entity handle from a raw id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for Entity {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// A single contact between two colliding bodies.
///
/// The impulse accumulators live only for the duration of one simulation
/// step: the solver accumulates into them across its iterations, and the
/// contact is rebuilt from scratch on the next step (no warm starting
/// between frames).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactPoint {
    /// Contact position in world coordinates.
    pub position: Point3<f64>,
    /// Unit contact normal, pointing from body A toward body B.
    pub normal: Vector3<f64>,
    /// Penetration depth along the normal (≥ 0).
    pub penetration: f64,
    /// Accumulated normal impulse across solver iterations this step.
    pub normal_impulse: f64,
    /// Accumulated tangential (friction) impulses this step.
    pub tangent_impulse: [f64; 2],
}

impl ContactPoint {
    /// Create a contact with zeroed impulse accumulators.
    #[must_use]
    pub fn new(position: Point3<f64>, normal: Vector3<f64>, penetration: f64) -> Self {
        Self {
            position,
            normal,
            penetration,
            normal_impulse: 0.0,
            tangent_impulse: [0.0; 2],
        }
    }

    /// Return this contact with the normal direction reversed, for a
    /// swapped body pair.
    #[must_use]
    pub fn flip(mut self) -> Self {
        self.normal = -self.normal;
        self
    }
}

/// All contacts between one entity pair during one step.
///
/// Rebuilt every step; holding one across an `update` call yields stale
/// data. The narrow phase in this design produces at most one point per
/// pair, hence the inline capacity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionEvent {
    /// First entity of the pair.
    pub entity_a: Entity,
    /// Second entity of the pair.
    pub entity_b: Entity,
    /// Contact points for this pair.
    pub contacts: SmallVec<[ContactPoint; 1]>,
    /// True if either collider is a trigger; trigger events are reported
    /// but never passed to the constraint solver.
    pub is_trigger_event: bool,
}

impl CollisionEvent {
    /// Create an event from a single contact point.
    #[must_use]
    pub fn new(
        entity_a: Entity,
        entity_b: Entity,
        contact: ContactPoint,
        is_trigger_event: bool,
    ) -> Self {
        let mut contacts = SmallVec::new();
        contacts.push(contact);
        Self {
            entity_a,
            entity_b,
            contacts,
            is_trigger_event,
        }
    }

    /// Check whether this event involves the given entity.
    #[must_use]
    pub fn involves(&self, entity: Entity) -> bool {
        self.entity_a == entity || self.entity_b == entity
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_handle() {
        let e = Entity::new(7);
        assert_eq!(e.raw(), 7);
        assert_eq!(e.to_string(), "Entity(7)");
        assert_eq!(Entity::from(7), e);
    }

    #[test]
    fn test_contact_starts_with_zero_impulses() {
        let contact = ContactPoint::new(Point3::origin(), Vector3::y(), 0.01);
        assert_eq!(contact.normal_impulse, 0.0);
        assert_eq!(contact.tangent_impulse, [0.0, 0.0]);
    }

    #[test]
    fn test_flip_reverses_normal() {
        let contact = ContactPoint::new(Point3::origin(), Vector3::y(), 0.01);
        let flipped = contact.flip();
        assert_eq!(flipped.normal, -Vector3::y());
        assert_eq!(flipped.penetration, 0.01);
    }

    #[test]
    fn test_event_involves() {
        let event = CollisionEvent::new(
            Entity::new(1),
            Entity::new(2),
            ContactPoint::new(Point3::origin(), Vector3::y(), 0.0),
            false,
        );
        assert!(event.involves(Entity::new(1)));
        assert!(event.involves(Entity::new(2)));
        assert!(!event.involves(Entity::new(3)));
    }
}
