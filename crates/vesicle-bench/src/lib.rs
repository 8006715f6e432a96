//! Benchmark profiles and utilities for the Vesicle simulation framework.
//!
//! Provides pre-built [`SimulationConfig`] profiles for benchmarking and
//! examples:
//!
//! - [`reference_profile`]: 100 compartments and 100 particles
//! - [`stress_profile`]: 1000 compartments and 1000 particles
//! - [`init_particle_positions`]: deterministic non-overlapping placement

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use vesicle_core::{DVec2, QuantityId, Updatable, UpdatableId, Updatables};
use vesicle_engine::SimulationConfig;
use vesicle_module::DisplacementModule;
use vesicle_modules::{brownian, FirstOrderReaction, ReversibleReaction};
use vesicle_space::{Bounds, Segment, SpatialLayer};

/// Precursor quantity of the reference kinetics.
pub const PRECURSOR: QuantityId = QuantityId(0);
/// Intermediate quantity of the reference kinetics.
pub const INTERMEDIATE: QuantityId = QuantityId(1);
/// Product quantity of the reference kinetics.
pub const PRODUCT: QuantityId = QuantityId(2);

/// Particle radius used by every profile.
pub const PARTICLE_RADIUS: f64 = 0.05;

/// Build a reference benchmark profile: 100 compartments, 100 particles.
///
/// Pipeline: Reversible(A ⇌ B, kf=1.0, kb=0.2) → FirstOrder(B → C, k=0.5)
/// → Brownian(D=0.05). The spatial layer is a 20x20 box split by one
/// membrane.
pub fn reference_profile(seed: u64) -> SimulationConfig {
    profile(100, 100, seed)
}

/// Build a stress benchmark profile: 1000 compartments, 1000 particles.
///
/// Same pipeline as [`reference_profile`] at 10x the entity count.
pub fn stress_profile(seed: u64) -> SimulationConfig {
    profile(1000, 1000, seed)
}

fn profile(compartments: u32, particles: u32, seed: u64) -> SimulationConfig {
    let bounds = Bounds::new(DVec2::splat(-10.0), DVec2::splat(10.0))
        .unwrap_or_else(|e| panic!("profile bounds: {e}"));
    let membrane = Segment::new(DVec2::new(0.0, -10.0), DVec2::new(0.0, 10.0))
        .unwrap_or_else(|e| panic!("profile membrane: {e}"));

    let mut updatables = Updatables::new();
    for i in 0..compartments {
        let load = 1.0 + f64::from(i % 7) * 0.25;
        updatables.insert(Updatable::compartment(
            UpdatableId(i),
            [(PRECURSOR, load), (INTERMEDIATE, 0.0), (PRODUCT, 0.0)],
        ));
    }
    for (offset, position) in init_particle_positions(particles as usize, &bounds, seed)
        .into_iter()
        .enumerate()
    {
        let id = UpdatableId(compartments + offset as u32);
        updatables.insert(
            Updatable::particle(id, position, PARTICLE_RADIUS)
                .with_concentrations([(PRECURSOR, 0.1), (INTERMEDIATE, 0.0)]),
        );
    }

    let binding = ReversibleReaction::builder()
        .name("binding")
        .substrate(PRECURSOR)
        .product(INTERMEDIATE)
        .forward(1.0)
        .backward(0.2)
        .build()
        .unwrap_or_else(|e| panic!("profile binding: {e}"));
    let conversion = FirstOrderReaction::builder()
        .name("conversion")
        .substrate(INTERMEDIATE)
        .product(PRODUCT)
        .rate(0.5)
        .build()
        .unwrap_or_else(|e| panic!("profile conversion: {e}"));
    let motion = DisplacementModule::builder("brownian")
        .always(brownian(0.05, seed))
        .build();

    let mut config = SimulationConfig::new(
        updatables,
        vec![Box::new(binding), Box::new(conversion), Box::new(motion)],
    );
    config.spatial = Some(SpatialLayer::new(bounds).with_membrane(membrane));
    config.max_step = Some(1.0);
    config
}

/// Generate deterministic initial particle positions.
///
/// Places `n` particles on a jittered lattice inside `bounds`, keeping
/// clear of the vertical line `x = 0` and of each other. The jitter is a
/// simple hash of the seed.
pub fn init_particle_positions(n: usize, bounds: &Bounds, seed: u64) -> Vec<DVec2> {
    let side = (n as f64).sqrt().ceil().max(1.0) as usize;
    let span = bounds.max() - bounds.min();
    let cell = span / side as f64;
    let slack = (cell - DVec2::splat(4.0 * PARTICLE_RADIUS)).max(DVec2::ZERO);

    let mut positions = Vec::with_capacity(n);
    for i in 0..n {
        let (row, col) = (i / side, i % side);
        let hash = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add((i as u64).wrapping_mul(1442695040888963407));
        let jx = (hash >> 11) as f64 / (1u64 << 53) as f64 - 0.5;
        let jy = (hash & 0xFFFF) as f64 / 65536.0 - 0.5;

        let centre = bounds.min() + cell * DVec2::new(col as f64 + 0.5, row as f64 + 0.5);
        let mut p = centre + slack * DVec2::new(jx, jy);
        if p.x.abs() < 2.0 * PARTICLE_RADIUS {
            p.x = 2.0 * PARTICLE_RADIUS * p.x.signum();
        }
        positions.push(p);
    }
    positions
}
