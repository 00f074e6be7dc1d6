//! The fixed-timestep simulation driver.
//!
//! [`PhysicsSystem::update`] accumulates wall-clock time and runs whole
//! fixed steps while the accumulator holds at least one timestep, which
//! decouples simulation stability from frame rate. Within a step the phases
//! run in a fixed order:
//!
//! 1. clear per-step contact state
//! 2. integrate forces into velocities
//! 3. broad-phase candidate pairs
//! 4. narrow-phase contact generation
//! 5. sequential-impulse constraint solve
//! 6. integrate positions
//! 7. update sleep states
//!
//! Static and sleeping bodies are filtered inside each phase, never by
//! skipping a phase. No upper bound is placed on steps per call: a caller
//! that stalls will pay the backlog down on its next call (the classic
//! spiral-of-death risk of unclamped accumulators).

use nalgebra::{Point3, Quaternion, UnitQuaternion, Vector3};
use phys_collision::{
    collider_aabb, contact_for_pair, Aabb, BroadPhaseConfig, BroadPhaseDetector, BroadPhaseProxy,
};
use phys_types::{BodyType, CollisionEvent, Entity, PhysicsConstants};
use tracing::{debug, trace};

use crate::solver::{ContactSolver, SolverConfig};
use crate::store::World;

/// Seconds of continuously low kinetic energy before a body sleeps.
const SLEEP_TIME: f64 = 0.5;

/// Angular speeds below this skip quaternion integration entirely.
const ANGULAR_EPSILON: f64 = 1e-6;

/// Result of a raycast query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// The entity that was hit.
    pub entity: Entity,
    /// Hit point in world coordinates.
    pub point: Point3<f64>,
    /// Surface normal at the hit point.
    pub normal: Vector3<f64>,
    /// Distance from the ray origin to the hit point.
    pub distance: f64,
}

/// The rigid-body simulation loop.
///
/// Owns all simulation configuration (gravity, constants, timestep); there
/// is no ambient global state. Collision events for the most recent step
/// are available from [`collision_events`](Self::collision_events) until
/// the next `update` call rebuilds them.
#[derive(Debug, Clone)]
pub struct PhysicsSystem {
    gravity: Vector3<f64>,
    constants: PhysicsConstants,
    simulation_enabled: bool,
    fixed_timestep: f64,
    accumulator: f64,
    step_count: u64,
    broad_phase: BroadPhaseDetector,
    solver: ContactSolver,
    collision_events: Vec<CollisionEvent>,
    proxies: Vec<BroadPhaseProxy>,
}

impl Default for PhysicsSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsSystem {
    /// Create a system with default configuration: Earth gravity along -Y
    /// and a 60 Hz fixed timestep.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gravity: Vector3::new(0.0, -9.81, 0.0),
            constants: PhysicsConstants::default(),
            simulation_enabled: true,
            fixed_timestep: 1.0 / 60.0,
            accumulator: 0.0,
            step_count: 0,
            broad_phase: BroadPhaseDetector::default(),
            solver: ContactSolver::default(),
            collision_events: Vec::new(),
            proxies: Vec::new(),
        }
    }

    /// Set the gravity vector.
    pub fn set_gravity(&mut self, gravity: Vector3<f64>) {
        self.gravity = gravity;
    }

    /// Get the gravity vector.
    #[must_use]
    pub fn gravity(&self) -> Vector3<f64> {
        self.gravity
    }

    /// Replace the physics constants.
    pub fn set_physics_constants(&mut self, constants: PhysicsConstants) {
        self.constants = constants;
    }

    /// Get the physics constants.
    #[must_use]
    pub fn physics_constants(&self) -> &PhysicsConstants {
        &self.constants
    }

    /// Enable or disable simulation. While disabled, `update` is a no-op
    /// and the accumulator does not grow.
    pub fn set_simulation_enabled(&mut self, enabled: bool) {
        self.simulation_enabled = enabled;
    }

    /// Whether simulation is enabled.
    #[must_use]
    pub fn is_simulation_enabled(&self) -> bool {
        self.simulation_enabled
    }

    /// Set the fixed timestep in seconds.
    ///
    /// The value is taken as-is; callers are responsible for sane ranges.
    pub fn set_fixed_timestep(&mut self, timestep: f64) {
        self.fixed_timestep = timestep;
    }

    /// Get the fixed timestep in seconds.
    #[must_use]
    pub fn fixed_timestep(&self) -> f64 {
        self.fixed_timestep
    }

    /// Replace the solver configuration.
    pub fn set_solver_config(&mut self, config: SolverConfig) {
        self.solver = ContactSolver::new(config);
    }

    /// Replace the broad-phase configuration.
    pub fn set_broad_phase_config(&mut self, config: BroadPhaseConfig) {
        self.broad_phase = BroadPhaseDetector::new(config);
    }

    /// Collision events produced by the most recent step.
    ///
    /// Cleared and rebuilt every step; references are stale after the next
    /// `update`.
    #[must_use]
    pub fn collision_events(&self) -> &[CollisionEvent] {
        &self.collision_events
    }

    /// Discard the current step's collision events early.
    pub fn clear_collision_events(&mut self) {
        self.collision_events.clear();
    }

    /// Total number of fixed steps executed so far.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Advance the simulation by `delta_time` seconds of wall-clock time.
    ///
    /// Runs zero or more fixed steps depending on the accumulator. Never
    /// panics; degenerate numeric states are handled by guards inside the
    /// phases.
    pub fn update(&mut self, world: &mut World, delta_time: f64) {
        if !self.simulation_enabled {
            return;
        }

        self.accumulator += delta_time;

        while self.accumulator >= self.fixed_timestep {
            let dt = self.fixed_timestep;
            self.step(world, dt);
            self.accumulator -= dt;
        }
    }

    /// Run exactly one fixed step of size `dt`.
    fn step(&mut self, world: &mut World, dt: f64) {
        self.collision_events.clear();

        self.integrate_forces(world, dt);
        let pairs = self.broad_phase_pairs(world);
        self.narrow_phase(world, &pairs);
        self.solver
            .solve(&mut self.collision_events, world, &self.constants, dt);
        Self::integrate_positions(world, dt);
        Self::update_sleep_states(world, dt, self.constants.sleep_threshold);

        self.step_count += 1;
        debug!(
            step = self.step_count,
            contacts = self.collision_events.len(),
            "fixed step complete"
        );
    }

    /// Phase 2: gravity, velocity integration, damping, clamping.
    ///
    /// Dynamic non-sleeping bodies only; force/torque accumulators are
    /// zeroed for the next step.
    fn integrate_forces(&mut self, world: &mut World, dt: f64) {
        let constants = &self.constants;

        for body in world.bodies.data_mut() {
            if body.body_type != BodyType::Dynamic || body.is_sleeping {
                continue;
            }

            body.force += self.gravity * body.mass;

            body.velocity += body.force * body.inverse_mass * dt;
            body.velocity *= (1.0 - body.linear_damping).powf(dt);

            body.angular_velocity += body.inverse_inertia_tensor * body.torque * dt;
            body.angular_velocity *= (1.0 - body.angular_damping).powf(dt);

            // Direction-preserving speed clamps.
            let speed = body.velocity.norm();
            if speed > constants.max_linear_velocity {
                body.velocity *= constants.max_linear_velocity / speed;
            }
            let angular_speed = body.angular_velocity.norm();
            if angular_speed > constants.max_angular_velocity {
                body.angular_velocity *= constants.max_angular_velocity / angular_speed;
            }

            body.force = Vector3::zeros();
            body.torque = Vector3::zeros();
        }
    }

    /// Phase 3: candidate pairs from AABB overlap over all collidable
    /// entities.
    fn broad_phase_pairs(&mut self, world: &World) -> Vec<(Entity, Entity)> {
        self.proxies.clear();
        for (entity, collider) in world.colliders.iter() {
            let Some(transform) = world.transforms.get(entity) else {
                continue;
            };
            self.proxies
                .push(BroadPhaseProxy::new(entity, collider, transform.position));
        }

        let pairs = self.broad_phase.find_potential_pairs(&self.proxies);
        trace!(candidates = pairs.len(), "broad phase");
        pairs
    }

    /// Phase 4: exact shape tests on each candidate pair, recording one
    /// event per colliding pair.
    fn narrow_phase(&mut self, world: &World, pairs: &[(Entity, Entity)]) {
        for &(entity_a, entity_b) in pairs {
            let (Some(collider_a), Some(collider_b)) =
                (world.colliders.get(entity_a), world.colliders.get(entity_b))
            else {
                continue;
            };
            let (Some(transform_a), Some(transform_b)) = (
                world.transforms.get(entity_a),
                world.transforms.get(entity_b),
            ) else {
                continue;
            };

            if let Some(contact) = contact_for_pair(
                collider_a,
                transform_a.position,
                collider_b,
                transform_b.position,
            ) {
                self.collision_events.push(CollisionEvent::new(
                    entity_a,
                    entity_b,
                    contact,
                    collider_a.is_trigger || collider_b.is_trigger,
                ));
            }
        }
    }

    /// Phase 6: position and orientation integration for non-static,
    /// non-sleeping bodies.
    fn integrate_positions(world: &mut World, dt: f64) {
        let bodies = &world.bodies;
        let transforms = &mut world.transforms;

        for (entity, body) in bodies.iter() {
            if body.body_type == BodyType::Static || body.is_sleeping {
                continue;
            }
            let Some(transform) = transforms.get_mut(entity) else {
                continue;
            };

            transform.position += body.velocity * dt;

            // First-order quaternion update q += 0.5·(0,ω)·q·dt with
            // renormalization, skipped for near-zero angular velocity.
            if body.angular_velocity.norm() > ANGULAR_EPSILON {
                let omega = Quaternion::new(
                    0.0,
                    body.angular_velocity.x,
                    body.angular_velocity.y,
                    body.angular_velocity.z,
                );
                let q = transform.rotation.into_inner();
                let delta = omega * q * (0.5 * dt);
                transform.rotation = UnitQuaternion::new_normalize(q + delta);
            }
        }
    }

    /// Phase 7: accumulate sleep timers for low-energy dynamic bodies and
    /// hard-zero velocities once they sleep.
    ///
    /// The kinetic energy here uses the raw angular speed squared rather
    /// than `ωᵀIω`.
    fn update_sleep_states(world: &mut World, dt: f64, sleep_threshold: f64) {
        for body in world.bodies.data_mut() {
            if body.body_type != BodyType::Dynamic {
                continue;
            }

            if body.kinetic_energy() < sleep_threshold {
                body.sleep_timer += dt;
                if body.sleep_timer > SLEEP_TIME {
                    body.is_sleeping = true;
                    body.velocity = Vector3::zeros();
                    body.angular_velocity = Vector3::zeros();
                }
            } else {
                body.sleep_timer = 0.0;
                body.is_sleeping = false;
            }
        }
    }

    // --- Queries -------------------------------------------------------

    /// Cast a ray and return the nearest hit within `max_distance`.
    ///
    /// Spheres are tested analytically; boxes against their world-aligned
    /// AABB; capsules against their broad-phase AABB. Returns `None` for a
    /// zero direction.
    #[must_use]
    pub fn raycast(
        &self,
        world: &World,
        origin: Point3<f64>,
        direction: Vector3<f64>,
        max_distance: f64,
    ) -> Option<RaycastHit> {
        self.raycast_all(world, origin, direction, max_distance)
            .into_iter()
            .next()
    }

    /// Cast a ray and return all hits within `max_distance`, nearest first.
    #[must_use]
    pub fn raycast_all(
        &self,
        world: &World,
        origin: Point3<f64>,
        direction: Vector3<f64>,
        max_distance: f64,
    ) -> Vec<RaycastHit> {
        let norm = direction.norm();
        if norm < 1e-12 {
            return Vec::new();
        }
        let dir = direction / norm;

        let mut hits = Vec::new();
        for (entity, collider) in world.colliders.iter() {
            let Some(transform) = world.transforms.get(entity) else {
                continue;
            };

            let hit = match collider.shape {
                phys_types::ColliderShape::Sphere { radius } => ray_sphere(
                    origin,
                    dir,
                    transform.position + collider.offset,
                    radius,
                    max_distance,
                ),
                _ => {
                    let aabb = collider_aabb(collider, transform.position);
                    ray_aabb(origin, dir, &aabb, max_distance)
                }
            };

            if let Some((distance, point, normal)) = hit {
                hits.push(RaycastHit {
                    entity,
                    point,
                    normal,
                    distance,
                });
            }
        }

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits
    }

    /// All entities whose collider AABB comes within `radius` of `center`.
    #[must_use]
    pub fn overlap_sphere(
        &self,
        world: &World,
        center: Point3<f64>,
        radius: f64,
    ) -> Vec<Entity> {
        let mut result = Vec::new();
        for (entity, collider) in world.colliders.iter() {
            let Some(transform) = world.transforms.get(entity) else {
                continue;
            };
            let aabb = collider_aabb(collider, transform.position);
            let closest = aabb.closest_point(center);
            if (center - closest).norm_squared() <= radius * radius {
                result.push(entity);
            }
        }
        result
    }

    /// All entities whose collider AABB overlaps the given box.
    #[must_use]
    pub fn overlap_box(&self, world: &World, aabb: &Aabb) -> Vec<Entity> {
        let mut result = Vec::new();
        for (entity, collider) in world.colliders.iter() {
            let Some(transform) = world.transforms.get(entity) else {
                continue;
            };
            if collider_aabb(collider, transform.position).overlaps(aabb) {
                result.push(entity);
            }
        }
        result
    }
}

/// Analytic ray–sphere intersection; origins inside the sphere report a hit
/// at distance zero.
fn ray_sphere(
    origin: Point3<f64>,
    dir: Vector3<f64>,
    center: Point3<f64>,
    radius: f64,
    max_distance: f64,
) -> Option<(f64, Point3<f64>, Vector3<f64>)> {
    let to_origin = origin - center;
    let b = to_origin.dot(&dir);
    let c = to_origin.norm_squared() - radius * radius;

    if c < 0.0 {
        // Inside the sphere.
        return Some((0.0, origin, -dir));
    }

    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    let t = -b - discriminant.sqrt();
    if t < 0.0 || t > max_distance {
        return None;
    }

    let point = origin + dir * t;
    let normal = (point - center) / radius;
    Some((t, point, normal))
}

/// Ray–AABB via the slab test, deriving the face normal from the hit point.
fn ray_aabb(
    origin: Point3<f64>,
    dir: Vector3<f64>,
    aabb: &Aabb,
    max_distance: f64,
) -> Option<(f64, Point3<f64>, Vector3<f64>)> {
    let t = aabb.ray_intersect(origin, dir, max_distance)?;
    let point = origin + dir * t;

    if t == 0.0 {
        return Some((0.0, point, -dir));
    }

    // The face containing the hit point has the largest normalized offset
    // from the box center.
    let half = aabb.half_extents();
    let offset = point - aabb.center();
    let ratio = Vector3::new(
        if half.x > 0.0 { offset.x / half.x } else { 0.0 },
        if half.y > 0.0 { offset.y / half.y } else { 0.0 },
        if half.z > 0.0 { offset.z / half.z } else { 0.0 },
    );

    let mut normal = Vector3::zeros();
    if ratio.x.abs() >= ratio.y.abs() && ratio.x.abs() >= ratio.z.abs() {
        normal.x = ratio.x.signum();
    } else if ratio.y.abs() >= ratio.z.abs() {
        normal.y = ratio.y.signum();
    } else {
        normal.z = ratio.z.signum();
    }

    Some((t, point, normal))
}
