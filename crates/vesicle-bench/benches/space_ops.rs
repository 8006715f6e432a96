//! Criterion micro-benchmarks for collision checking.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use vesicle_bench::{init_particle_positions, PARTICLE_RADIUS};
use vesicle_core::{DVec2, DisplacementDelta, ModuleId, Updatable, UpdatableId, Updatables};
use vesicle_space::{Bounds, Segment, SpatialLayer};

/// `n` particles, each with a small pending move applied to its
/// tentative position.
fn moved_particles(n: usize, bounds: &Bounds) -> Updatables {
    init_particle_positions(n, bounds, 42)
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            let mut u = Updatable::particle(UpdatableId(i as u32), p, PARTICLE_RADIUS);
            let step = DVec2::new(if i % 2 == 0 { 0.01 } else { -0.01 }, 0.005);
            u.add_displacement_delta(DisplacementDelta::new(ModuleId(0), step))
                .unwrap();
            u.apply_deltas();
            u
        })
        .collect()
}

/// Benchmark: check 1000 moving particles against each other and one
/// membrane.
fn bench_check_collisions_1k(c: &mut Criterion) {
    let bounds = Bounds::new(DVec2::splat(-10.0), DVec2::splat(10.0)).unwrap();
    let membrane = Segment::new(DVec2::new(0.0, -10.0), DVec2::new(0.0, 10.0)).unwrap();
    let layer = SpatialLayer::new(bounds).with_membrane(membrane);
    let particles = moved_particles(1000, &bounds);

    c.bench_function("check_collisions_1k", |b| {
        b.iter(|| {
            let mut reg = particles.clone();
            let violations = layer.check_for_collisions(&mut reg);
            black_box(&violations);
        });
    });
}

/// Benchmark: check and commit 100 moving particles.
fn bench_apply_deltas_100(c: &mut Criterion) {
    let bounds = Bounds::new(DVec2::splat(-10.0), DVec2::splat(10.0)).unwrap();
    let layer = SpatialLayer::new(bounds);
    let particles = moved_particles(100, &bounds);

    c.bench_function("apply_deltas_100", |b| {
        b.iter(|| {
            let mut reg = particles.clone();
            let violations = layer.apply_deltas(&mut reg);
            black_box(&violations);
        });
    });
}

criterion_group!(benches, bench_check_collisions_1k, bench_apply_deltas_100);
criterion_main!(benches);
