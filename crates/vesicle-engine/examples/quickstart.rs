//! Vesicle quickstart: a small reaction-diffusion run from scratch.
//!
//! Demonstrates:
//!   1. Building compartments and particles
//!   2. A first-order reaction and a Brownian displacement module
//!   3. A spatial layer with a membrane
//!   4. Running to a target time and reading the result
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example quickstart

use std::sync::atomic::AtomicBool;

use tracing_subscriber::EnvFilter;
use vesicle_core::{DVec2, QuantityId, Updatable, UpdatableId, Updatables};
use vesicle_engine::{Simulation, SimulationConfig, TimeStepEvent};
use vesicle_module::DisplacementModule;
use vesicle_modules::{brownian, FirstOrderReaction};
use vesicle_space::{Bounds, Segment, SpatialLayer};

// ─── Quantities ─────────────────────────────────────────────────

const PRECURSOR: QuantityId = QuantityId(0);
const PRODUCT: QuantityId = QuantityId(1);

// ─── Parameters ─────────────────────────────────────────────────

const RATE: f64 = 2.0;
const DIFFUSIVITY: f64 = 0.5;
const SEED: u64 = 42;
const END_TIME: f64 = 2.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Two compartments, and a vesicle on each side of a membrane.
    let updatables: Updatables = [
        Updatable::compartment(UpdatableId(0), [(PRECURSOR, 1.0), (PRODUCT, 0.0)]),
        Updatable::compartment(UpdatableId(1), [(PRECURSOR, 0.5), (PRODUCT, 0.0)]),
        Updatable::particle(UpdatableId(2), DVec2::new(-2.0, 0.0), 0.2),
        Updatable::particle(UpdatableId(3), DVec2::new(2.0, 0.0), 0.2)
            .with_concentrations([(PRECURSOR, 0.2)]),
    ]
    .into_iter()
    .collect();

    let reaction = FirstOrderReaction::builder()
        .name("conversion")
        .substrate(PRECURSOR)
        .product(PRODUCT)
        .rate(RATE)
        .build()?;
    let motion = DisplacementModule::builder("brownian")
        .always(brownian(DIFFUSIVITY, SEED))
        .build();

    let membrane = Segment::new(DVec2::new(0.0, -10.0), DVec2::new(0.0, 10.0))?;
    let bounds = Bounds::new(DVec2::splat(-10.0), DVec2::splat(10.0))?;
    let layer = SpatialLayer::new(bounds).with_membrane(membrane);

    let mut config = SimulationConfig::new(updatables, vec![Box::new(reaction), Box::new(motion)]);
    config.spatial = Some(layer);
    config.max_step = Some(0.25);

    let mut sim = Simulation::new(config)?;
    sim.scheduler_mut().on_time_step_event(|event| match event {
        TimeStepEvent::Increase { step } => println!("  step grew to {step:.4}"),
        TimeStepEvent::Decrease { step, reason } => {
            println!("  step shrank to {step:.4} ({reason})")
        }
    });

    let stop = AtomicBool::new(false);
    let summary = sim.run_until(END_TIME, &stop)?;
    println!(
        "{} epochs, {} retries, {} rejected moves, t = {:.3}",
        summary.epochs, summary.retries, summary.collisions, summary.elapsed
    );

    for u in sim.scheduler().updatables().iter() {
        let precursor = u.concentration(PRECURSOR);
        let product = u.concentration(PRODUCT);
        match u.position() {
            Some(p) => println!(
                "  #{} at ({:.2}, {:.2}): precursor {precursor:.4}, product {product:.4}",
                u.id(),
                p.current.x,
                p.current.y
            ),
            None => println!("  #{}: precursor {precursor:.4}, product {product:.4}", u.id()),
        }
    }
    Ok(())
}
