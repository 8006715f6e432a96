//! Adaptive time-stepping epoch scheduler for Vesicle simulations.
//!
//! The [`Scheduler`] advances simulated time in epochs. Each epoch runs
//! every module at the current step, judges their local errors, checks
//! the combined update by step doubling, and either commits or shrinks
//! the step and retries. [`Simulation`] wraps it in a run loop with a
//! cooperative stop flag.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod displacement;
pub mod epoch;
pub mod error_manager;
pub mod metrics;
pub mod numerical;
pub mod scheduler;
pub mod simulation;

pub use clock::{DecreaseReason, TimeStepEvent, TimeStepManager};
pub use config::{ConfigError, SimulationConfig, Tolerances};
pub use epoch::{EpochOutcome, EpochPhase};
pub use error_manager::ErrorManager;
pub use metrics::EpochMetrics;
pub use scheduler::Scheduler;
pub use simulation::{RunSummary, Simulation};
