//! Dense component storage and the simulation world.
//!
//! Components of each type live in a dense array with a parallel entity
//! list and a hash index for handle lookup, so per-step iteration touches
//! contiguous memory while handle access stays O(1). Removal swap-pops,
//! which means iteration order is insertion order until the first removal.
//!
//! The simulation mutates these stores only from inside
//! [`PhysicsSystem::update`](crate::PhysicsSystem::update); no other writer
//! may run concurrently with a step.

use hashbrown::HashMap;
use nalgebra::{Point3, UnitQuaternion};
use phys_types::{Collider, Entity, RigidBody};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ballistics::Projectile;

/// World-space position and orientation of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transform {
    /// Position in world coordinates.
    pub position: Point3<f64>,
    /// Orientation as a unit quaternion.
    pub rotation: UnitQuaternion<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// Identity transform at the origin.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Transform at a position with identity rotation.
    #[must_use]
    pub fn from_position(position: Point3<f64>) -> Self {
        Self {
            position,
            rotation: UnitQuaternion::identity(),
        }
    }
}

/// Dense storage for one component type.
#[derive(Debug, Clone)]
pub struct ComponentStore<T> {
    entities: Vec<Entity>,
    data: Vec<T>,
    index: HashMap<Entity, usize>,
}

impl<T> Default for ComponentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ComponentStore<T> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            data: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Number of stored components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Entities with this component, in dense order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// The dense component array, parallel to [`entities`](Self::entities).
    #[must_use]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable dense component array.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Check whether an entity has this component.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.index.contains_key(&entity)
    }

    /// Get the component for an entity.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.index.get(&entity).map(|&i| &self.data[i])
    }

    /// Get the component for an entity, mutably.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.index.get(&entity).map(|&i| &mut self.data[i])
    }

    /// Get components for two distinct entities, both mutably.
    ///
    /// Returns `None` if either is missing or the entities are equal.
    pub fn get2_mut(&mut self, a: Entity, b: Entity) -> Option<(&mut T, &mut T)> {
        let ia = *self.index.get(&a)?;
        let ib = *self.index.get(&b)?;
        if ia == ib {
            return None;
        }

        let (lo, hi, swapped) = if ia < ib {
            (ia, ib, false)
        } else {
            (ib, ia, true)
        };
        let (left, right) = self.data.split_at_mut(hi);
        let (x, y) = (&mut left[lo], &mut right[0]);
        Some(if swapped { (y, x) } else { (x, y) })
    }

    /// Insert or replace the component for an entity.
    pub fn insert(&mut self, entity: Entity, value: T) {
        if let Some(&i) = self.index.get(&entity) {
            self.data[i] = value;
        } else {
            self.index.insert(entity, self.data.len());
            self.entities.push(entity);
            self.data.push(value);
        }
    }

    /// Remove the component for an entity, returning it.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let i = self.index.remove(&entity)?;
        self.entities.swap_remove(i);
        let value = self.data.swap_remove(i);
        if i < self.data.len() {
            self.index.insert(self.entities[i], i);
        }
        Some(value)
    }

    /// Iterate `(entity, &component)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.data.iter())
    }

    /// Iterate `(entity, &mut component)` pairs in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.entities.iter().copied().zip(self.data.iter_mut())
    }
}

/// The component stores the simulation operates on.
///
/// Entity allocation here is deliberately minimal: the simulation core does
/// not own entity lifetime in a larger application, but tests and small
/// consumers need a spawn/despawn surface.
#[derive(Debug, Clone, Default)]
pub struct World {
    next_entity: u64,
    /// Entity transforms.
    pub transforms: ComponentStore<Transform>,
    /// Rigid-body components.
    pub bodies: ComponentStore<RigidBody>,
    /// Collider components.
    pub colliders: ComponentStore<Collider>,
    /// Projectile (air drag) components.
    pub projectiles: ComponentStore<Projectile>,
}

impl World {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an entity with a transform at the given position.
    pub fn spawn(&mut self, position: Point3<f64>) -> Entity {
        let entity = Entity::new(self.next_entity);
        self.next_entity += 1;
        self.transforms
            .insert(entity, Transform::from_position(position));
        entity
    }

    /// Remove an entity and all of its components.
    pub fn despawn(&mut self, entity: Entity) {
        self.transforms.remove(entity);
        self.bodies.remove(entity);
        self.colliders.remove(entity);
        self.projectiles.remove(entity);
    }

    /// Number of live entities (those that still have a transform).
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.transforms.len()
    }
}
