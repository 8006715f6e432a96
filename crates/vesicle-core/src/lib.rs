//! Core types for the Vesicle simulation framework.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! data every other crate passes around: identifiers, the [`Updatable`]
//! state holder with its pending deltas, the epoch-scoped
//! [`NumericalError`] and [`DisplacementDeviation`] measurements, and the
//! error enums shared by modules and the scheduler.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod delta;
pub mod deviation;
pub mod error;
pub mod id;
pub mod numerical;
pub mod state;
pub mod updatable;

pub use delta::{ConcentrationDelta, DisplacementDelta};
pub use deviation::DisplacementDeviation;
pub use error::{ModuleError, StepError};
pub use id::{EpochId, ModuleId, QuantityId, UpdatableId};
pub use numerical::{step_doubling_error, NumericalError};
pub use state::{ConcentrationState, PositionState};
pub use updatable::{Updatable, Updatables};

/// Re-export of the 2D vector type used for positions and displacements.
pub use glam::DVec2;
