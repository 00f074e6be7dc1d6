//! Broad-phase scaling benchmarks: brute force vs sweep-and-prune.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Point3;
use phys_collision::{BroadPhase, BroadPhaseProxy, BruteForce, SweepAndPrune};
use phys_types::{Collider, ColliderShape, Entity};

/// Deterministic cloud of unit spheres with local clustering.
fn make_proxies(count: usize) -> Vec<BroadPhaseProxy> {
    (0..count)
        .map(|i| {
            let f = i as f64;
            BroadPhaseProxy::new(
                Entity::new(i as u64),
                &Collider::new(ColliderShape::sphere(0.5)),
                Point3::new(
                    (f * 0.61).sin() * 20.0,
                    (f * 1.27).cos() * 20.0,
                    (f * 0.35).sin() * 20.0,
                ),
            )
        })
        .collect()
}

fn bench_broad_phase(c: &mut Criterion) {
    let mut group = c.benchmark_group("broad_phase");

    for &count in &[16usize, 64, 256, 1024] {
        let proxies = make_proxies(count);

        group.bench_with_input(BenchmarkId::new("brute_force", count), &proxies, |b, p| {
            let mut brute = BruteForce::new();
            b.iter(|| black_box(brute.find_potential_pairs(p)));
        });

        group.bench_with_input(BenchmarkId::new("sweep_and_prune", count), &proxies, |b, p| {
            let mut sap = SweepAndPrune::new();
            b.iter(|| black_box(sap.find_potential_pairs(p)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_broad_phase);
criterion_main!(benches);
