//! Broad-phase collision detection.
//!
//! Produces the set of unordered entity pairs whose world-space AABBs
//! overlap. The contract is on the *output set*: every implementation here
//! yields exactly the pairs with overlapping AABBs, so the narrow phase can
//! treat them interchangeably.
//!
//! [`BruteForce`] is the O(n²) reference behavior; [`SweepAndPrune`] sorts
//! interval endpoints on the axis of greatest scene extent and is preferred
//! for larger scenes. [`BroadPhaseDetector`] picks between them by body
//! count.
//!
//! # Example
//!
//! ```
//! use nalgebra::Point3;
//! use phys_collision::{BroadPhase, BroadPhaseProxy, SweepAndPrune};
//! use phys_types::{Collider, ColliderShape, Entity};
//!
//! let proxies = vec![
//!     BroadPhaseProxy::new(
//!         Entity::new(1),
//!         &Collider::new(ColliderShape::sphere(1.0)),
//!         Point3::new(0.0, 0.0, 0.0),
//!     ),
//!     BroadPhaseProxy::new(
//!         Entity::new(2),
//!         &Collider::new(ColliderShape::sphere(1.0)),
//!         Point3::new(1.5, 0.0, 0.0),
//!     ),
//! ];
//!
//! // The spheres' AABBs overlap, so exactly one candidate pair comes back.
//! let mut sap = SweepAndPrune::new();
//! let pairs = sap.find_potential_pairs(&proxies);
//! assert_eq!(pairs.len(), 1);
//! ```

use nalgebra::{Point3, Vector3};
use phys_types::{Collider, Entity};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create an AABB from minimum and maximum corners.
    #[must_use]
    pub const fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with the given half-extents.
    #[must_use]
    pub fn from_center(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Component-wise interval overlap on all three axes.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Expand by a margin on all sides.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vector3::new(margin, margin, margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Half-extent along each axis.
    #[must_use]
    pub fn half_extents(&self) -> Vector3<f64> {
        (self.max - self.min) * 0.5
    }

    /// Closest point inside or on the box to the given point (per-axis
    /// clamp).
    #[must_use]
    pub fn closest_point(&self, point: Point3<f64>) -> Point3<f64> {
        Point3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
            point.z.clamp(self.min.z, self.max.z),
        )
    }

    /// Check whether a point lies inside or on the box.
    #[must_use]
    pub fn contains_point(&self, point: Point3<f64>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Slab-method ray intersection.
    ///
    /// Returns the entry distance along `direction` (0 if `origin` starts
    /// inside), or `None` if the ray misses within `max_distance`.
    /// `direction` must be non-zero; it need not be normalized, in which
    /// case distances are in units of its length.
    #[must_use]
    pub fn ray_intersect(
        &self,
        origin: Point3<f64>,
        direction: Vector3<f64>,
        max_distance: f64,
    ) -> Option<f64> {
        let mut t_min = 0.0_f64;
        let mut t_max = max_distance;

        for axis in 0..3 {
            let d = direction[axis];
            let o = origin[axis];
            if d.abs() < 1e-12 {
                // Ray parallel to this slab: must start inside it.
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
            } else {
                let inv = 1.0 / d;
                let mut t0 = (self.min[axis] - o) * inv;
                let mut t1 = (self.max[axis] - o) * inv;
                if t0 > t1 {
                    std::mem::swap(&mut t0, &mut t1);
                }
                t_min = t_min.max(t0);
                t_max = t_max.min(t1);
                if t_min > t_max {
                    return None;
                }
            }
        }

        Some(t_min)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Point3::origin(), Point3::origin())
    }
}

/// Compute the world-space AABB for a collider at the given position.
///
/// Translation-only: boxes are treated as world-aligned. The collider's
/// local offset shifts the box center.
#[must_use]
pub fn collider_aabb(collider: &Collider, position: Point3<f64>) -> Aabb {
    let center = position + collider.offset;
    Aabb::from_center(center, collider.shape.aabb_half_extents())
}

/// One collidable entity as seen by the broad phase.
#[derive(Debug, Clone, Copy)]
pub struct BroadPhaseProxy {
    /// The entity this proxy belongs to.
    pub entity: Entity,
    /// World-space bounds.
    pub aabb: Aabb,
}

impl BroadPhaseProxy {
    /// Create a proxy for an entity's collider at a position.
    #[must_use]
    pub fn new(entity: Entity, collider: &Collider, position: Point3<f64>) -> Self {
        Self {
            entity,
            aabb: collider_aabb(collider, position),
        }
    }
}

/// Trait for broad-phase pair-generation algorithms.
pub trait BroadPhase {
    /// Find all unordered entity pairs whose AABBs overlap.
    fn find_potential_pairs(&mut self, proxies: &[BroadPhaseProxy]) -> Vec<(Entity, Entity)>;
}

/// Exhaustive pairwise O(n²) broad phase.
///
/// This is the reference behavior; fine below a few dozen bodies.
#[derive(Debug, Clone, Default)]
pub struct BruteForce {
    margin: f64,
}

impl BruteForce {
    /// Create a brute-force broad phase.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predictive margin to every AABB.
    #[must_use]
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }
}

impl BroadPhase for BruteForce {
    fn find_potential_pairs(&mut self, proxies: &[BroadPhaseProxy]) -> Vec<(Entity, Entity)> {
        let mut pairs = Vec::new();

        for (i, a) in proxies.iter().enumerate() {
            let aabb_a = if self.margin > 0.0 {
                a.aabb.expanded(self.margin)
            } else {
                a.aabb
            };
            for b in proxies.iter().skip(i + 1) {
                let aabb_b = if self.margin > 0.0 {
                    b.aabb.expanded(self.margin)
                } else {
                    b.aabb
                };
                if aabb_a.overlaps(&aabb_b) {
                    pairs.push((a.entity, b.entity));
                }
            }
        }

        pairs
    }
}

/// Interval on the sweep axis.
#[derive(Debug, Clone, Copy)]
struct Interval {
    index: usize,
    min: f64,
    max: f64,
}

/// Sweep-and-prune (sort-and-sweep) broad phase.
///
/// Projects AABBs onto the axis of greatest scene extent, sorts by minimum
/// endpoint, and sweeps; candidate pairs are confirmed with the full
/// three-axis overlap test, so the output set equals the brute-force set.
/// Rust's adaptive sort makes the re-sort cheap under temporal coherence.
#[derive(Debug, Clone)]
pub struct SweepAndPrune {
    intervals: Vec<Interval>,
    margin: f64,
}

impl Default for SweepAndPrune {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepAndPrune {
    /// Create a sweep-and-prune broad phase.
    #[must_use]
    pub fn new() -> Self {
        Self {
            intervals: Vec::new(),
            margin: 0.0,
        }
    }

    /// Add a predictive margin to every AABB.
    #[must_use]
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Pick the axis with the widest spread of AABB centers.
    fn choose_sweep_axis(proxies: &[BroadPhaseProxy]) -> usize {
        let mut min = Vector3::repeat(f64::INFINITY);
        let mut max = Vector3::repeat(f64::NEG_INFINITY);

        for proxy in proxies {
            let c = proxy.aabb.center();
            for axis in 0..3 {
                min[axis] = min[axis].min(c[axis]);
                max[axis] = max[axis].max(c[axis]);
            }
        }

        let extent = max - min;
        if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        }
    }
}

impl BroadPhase for SweepAndPrune {
    fn find_potential_pairs(&mut self, proxies: &[BroadPhaseProxy]) -> Vec<(Entity, Entity)> {
        if proxies.is_empty() {
            return Vec::new();
        }

        let axis = Self::choose_sweep_axis(proxies);

        self.intervals.clear();
        for (index, proxy) in proxies.iter().enumerate() {
            let aabb = if self.margin > 0.0 {
                proxy.aabb.expanded(self.margin)
            } else {
                proxy.aabb
            };
            self.intervals.push(Interval {
                index,
                min: aabb.min[axis],
                max: aabb.max[axis],
            });
        }

        self.intervals.sort_by(|a, b| {
            a.min
                .partial_cmp(&b.min)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut pairs = Vec::new();
        for i in 0..self.intervals.len() {
            let lhs = self.intervals[i];
            for j in (i + 1)..self.intervals.len() {
                let rhs = self.intervals[j];
                if rhs.min > lhs.max {
                    break;
                }

                let a = &proxies[lhs.index];
                let b = &proxies[rhs.index];
                let aabb_a = if self.margin > 0.0 {
                    a.aabb.expanded(self.margin)
                } else {
                    a.aabb
                };
                let aabb_b = if self.margin > 0.0 {
                    b.aabb.expanded(self.margin)
                } else {
                    b.aabb
                };
                if aabb_a.overlaps(&aabb_b) {
                    pairs.push((a.entity, b.entity));
                }
            }
        }

        pairs
    }
}

/// Broad-phase algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BroadPhaseAlgorithm {
    /// Choose by body count.
    #[default]
    Auto,
    /// Always brute force.
    BruteForce,
    /// Always sweep-and-prune.
    SweepAndPrune,
}

/// Configuration for the broad phase.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BroadPhaseConfig {
    /// Which algorithm to run.
    pub algorithm: BroadPhaseAlgorithm,
    /// Predictive margin added to every AABB.
    pub margin: f64,
    /// Body count below which `Auto` uses brute force.
    pub brute_force_threshold: usize,
}

impl Default for BroadPhaseConfig {
    fn default() -> Self {
        Self {
            algorithm: BroadPhaseAlgorithm::Auto,
            margin: 0.0,
            brute_force_threshold: 32,
        }
    }
}

/// Algorithm-selecting wrapper used by the simulation loop.
#[derive(Debug, Clone)]
pub struct BroadPhaseDetector {
    config: BroadPhaseConfig,
    sap: SweepAndPrune,
    brute: BruteForce,
}

impl Default for BroadPhaseDetector {
    fn default() -> Self {
        Self::new(BroadPhaseConfig::default())
    }
}

impl BroadPhaseDetector {
    /// Create a detector with the given configuration.
    #[must_use]
    pub fn new(config: BroadPhaseConfig) -> Self {
        Self {
            sap: SweepAndPrune::new().with_margin(config.margin),
            brute: BruteForce::new().with_margin(config.margin),
            config,
        }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &BroadPhaseConfig {
        &self.config
    }

    /// Replace the configuration.
    pub fn set_config(&mut self, config: BroadPhaseConfig) {
        self.sap = SweepAndPrune::new().with_margin(config.margin);
        self.brute = BruteForce::new().with_margin(config.margin);
        self.config = config;
    }

    /// Find all overlapping-AABB entity pairs.
    pub fn find_potential_pairs(
        &mut self,
        proxies: &[BroadPhaseProxy],
    ) -> Vec<(Entity, Entity)> {
        match self.config.algorithm {
            BroadPhaseAlgorithm::Auto => {
                if proxies.len() < self.config.brute_force_threshold {
                    self.brute.find_potential_pairs(proxies)
                } else {
                    self.sap.find_potential_pairs(proxies)
                }
            }
            BroadPhaseAlgorithm::BruteForce => self.brute.find_potential_pairs(proxies),
            BroadPhaseAlgorithm::SweepAndPrune => self.sap.find_potential_pairs(proxies),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use phys_types::ColliderShape;

    fn sphere_proxy(id: u64, x: f64, y: f64, z: f64, radius: f64) -> BroadPhaseProxy {
        BroadPhaseProxy::new(
            Entity::new(id),
            &Collider::new(ColliderShape::sphere(radius)),
            Point3::new(x, y, z),
        )
    }

    #[test]
    fn test_aabb_overlap() {
        let a = Aabb::from_center(Point3::origin(), Vector3::repeat(1.0));
        let b = Aabb::from_center(Point3::new(1.5, 0.0, 0.0), Vector3::repeat(1.0));
        let c = Aabb::from_center(Point3::new(3.0, 0.0, 0.0), Vector3::repeat(0.5));

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_aabb_separated_on_one_axis_only() {
        let a = Aabb::from_center(Point3::origin(), Vector3::repeat(1.0));
        let b = Aabb::from_center(Point3::new(0.0, 5.0, 0.0), Vector3::repeat(1.0));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_collider_aabb_uses_offset() {
        let collider = Collider::new(ColliderShape::sphere(1.0))
            .with_offset(Vector3::new(0.0, 2.0, 0.0));
        let aabb = collider_aabb(&collider, Point3::origin());
        assert_eq!(aabb.min.y, 1.0);
        assert_eq!(aabb.max.y, 3.0);
    }

    #[test]
    fn test_capsule_aabb_extents() {
        let collider = Collider::new(ColliderShape::capsule(0.5, 1.0));
        let aabb = collider_aabb(&collider, Point3::origin());
        assert_eq!(aabb.max.x, 0.5);
        assert_eq!(aabb.max.y, 1.5);
        assert_eq!(aabb.max.z, 0.5);
    }

    #[test]
    fn test_brute_force_finds_overlapping_pair() {
        let proxies = vec![
            sphere_proxy(1, 0.0, 0.0, 0.0, 1.0),
            sphere_proxy(2, 1.5, 0.0, 0.0, 1.0),
            sphere_proxy(3, 10.0, 0.0, 0.0, 1.0),
        ];

        let pairs = BruteForce::new().find_potential_pairs(&proxies);
        assert_eq!(pairs, vec![(Entity::new(1), Entity::new(2))]);
    }

    #[test]
    fn test_sweep_matches_brute_force() {
        // Deterministic cluster layout with overlaps on different axes.
        let mut proxies = Vec::new();
        for i in 0..40_u64 {
            let f = i as f64;
            proxies.push(sphere_proxy(
                i,
                (f * 0.7).sin() * 6.0,
                (f * 1.3).cos() * 6.0,
                (f * 0.4).sin() * 6.0,
                0.9,
            ));
        }

        let mut brute: Vec<_> = BruteForce::new().find_potential_pairs(&proxies);
        let mut sweep: Vec<_> = SweepAndPrune::new().find_potential_pairs(&proxies);

        let key = |&(a, b): &(Entity, Entity)| {
            let (lo, hi) = if a.raw() <= b.raw() { (a, b) } else { (b, a) };
            (lo.raw(), hi.raw())
        };
        brute.sort_by_key(key);
        sweep.sort_by_key(key);
        assert_eq!(brute, sweep);
        assert!(!brute.is_empty());
    }

    #[test]
    fn test_detector_auto_switches() {
        let detector = BroadPhaseDetector::default();
        assert_eq!(detector.config().brute_force_threshold, 32);
    }

    #[test]
    fn test_ray_hits_box() {
        let aabb = Aabb::from_center(Point3::new(5.0, 0.0, 0.0), Vector3::repeat(1.0));
        let t = aabb.ray_intersect(Point3::origin(), Vector3::x(), 100.0);
        assert_eq!(t, Some(4.0));
    }

    #[test]
    fn test_ray_from_inside_reports_zero() {
        let aabb = Aabb::from_center(Point3::origin(), Vector3::repeat(1.0));
        let t = aabb.ray_intersect(Point3::origin(), Vector3::x(), 100.0);
        assert_eq!(t, Some(0.0));
    }

    #[test]
    fn test_ray_misses_behind() {
        let aabb = Aabb::from_center(Point3::new(-5.0, 0.0, 0.0), Vector3::repeat(1.0));
        let t = aabb.ray_intersect(Point3::origin(), Vector3::x(), 100.0);
        assert_eq!(t, None);
    }

    #[test]
    fn test_ray_parallel_slab_miss() {
        let aabb = Aabb::from_center(Point3::new(0.0, 5.0, 0.0), Vector3::repeat(1.0));
        // Parallel to the Y slabs, offset outside them.
        let t = aabb.ray_intersect(Point3::origin(), Vector3::x(), 100.0);
        assert_eq!(t, None);
    }
}
