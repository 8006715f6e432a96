//! Vesicle: adaptive time stepping for reaction-diffusion simulations.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Vesicle sub-crates. For most users, adding `vesicle` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::atomic::AtomicBool;
//! use vesicle::prelude::*;
//!
//! // A module that produces quantity 0 at a constant rate.
//! struct Source;
//! impl Module for Source {
//!     fn name(&self) -> &str { "source" }
//!     fn compute_deltas(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ModuleError> {
//!         let delta = 0.5 * ctx.step();
//!         for u in ctx.updatables().iter() {
//!             ctx.add_concentration_delta(u.id(), QuantityId(0), delta)?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let updatables: Updatables =
//!     [Updatable::compartment(UpdatableId(0), [(QuantityId(0), 1.0)])]
//!         .into_iter()
//!         .collect();
//! let config = SimulationConfig::new(updatables, vec![Box::new(Source)]);
//! let mut sim = Simulation::new(config).unwrap();
//! let outcome = sim.step().unwrap();
//! assert_eq!(outcome.epoch, EpochId(0));
//! assert!(outcome.increased);
//!
//! let summary = sim.run_until(1.0, &AtomicBool::new(false)).unwrap();
//! assert!(summary.elapsed >= 1.0);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `vesicle-core` | IDs, updatables, deltas, error measurements |
//! | [`space`] | `vesicle-space` | Bounds, membranes, collision checking |
//! | [`module`] | `vesicle-module` | Module trait, step context, displacement module |
//! | [`modules`] | `vesicle-modules` | Reference kinetics and motion |
//! | [`engine`] | `vesicle-engine` | Scheduler, time-step and error managers |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and IDs (`vesicle-core`).
///
/// Contains [`types::Updatable`] and its registry, the pending delta
/// types, and the [`types::NumericalError`] and
/// [`types::DisplacementDeviation`] measurements.
pub use vesicle_core as types;

/// Spatial layer (`vesicle-space`).
///
/// [`space::SpatialLayer`] checks tentative particle positions against
/// each other, [`space::Segment`] membranes and [`space::Bounds`].
pub use vesicle_space as space;

/// Module trait and step context (`vesicle-module`).
///
/// The [`module::Module`] trait is the main extension point for
/// user-defined simulation logic.
pub use vesicle_module as module;

/// Reference module implementations (`vesicle-modules`).
///
/// Includes [`modules::FirstOrderReaction`],
/// [`modules::ReversibleReaction`], and the [`modules::brownian`] and
/// [`modules::drift`] displacement functions.
pub use vesicle_modules as modules;

/// Epoch scheduler (`vesicle-engine`).
///
/// [`engine::Simulation`] for run loops, [`engine::Scheduler`] for
/// epoch-by-epoch control.
pub use vesicle_engine as engine;

/// Common imports for typical Vesicle usage.
///
/// ```rust
/// use vesicle::prelude::*;
/// ```
///
/// This imports the most frequently used types: updatables and IDs, the
/// module trait, the scheduler and its configuration, and the spatial
/// layer.
pub mod prelude {
    // Core types
    pub use vesicle_core::{
        DVec2, DisplacementDeviation, EpochId, ModuleId, NumericalError, QuantityId, Updatable,
        UpdatableId, Updatables,
    };

    // Errors
    pub use vesicle_core::{ModuleError, StepError};

    // Space
    pub use vesicle_space::{Bounds, Segment, SpatialLayer};

    // Module
    pub use vesicle_module::{DisplacementModule, EvaluationPhase, LocalError, Module, StepContext};

    // Engine
    pub use vesicle_engine::{
        ConfigError, EpochOutcome, RunSummary, Scheduler, Simulation, SimulationConfig,
        TimeStepEvent, Tolerances,
    };
}
