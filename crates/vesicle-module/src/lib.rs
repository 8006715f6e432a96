//! Module trait and step context for Vesicle simulations.
//!
//! A [`Module`] is a unit of computation that, given the committed state
//! of all updatables and the current step size, contributes tentative
//! deltas through a [`StepContext`]. Modules never mutate state or time
//! directly; the scheduler decides whether their contributions are
//! committed.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffer;
pub mod context;
pub mod displacement;
pub mod module;

pub use buffer::DeltaBuffer;
pub use context::{EvaluationPhase, StepContext};
pub use displacement::{DisplacementModule, DisplacementModuleBuilder};
pub use module::{LocalError, Module, ModuleState};
