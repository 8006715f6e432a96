//! Error types for the Vesicle simulation framework.
//!
//! Only fatal conditions are represented here. Recoverable signals
//! (numerical error, displacement deviation, collisions) are handled
//! inside the epoch loop and surface to callers as events and metrics,
//! never as `Err` values.

use std::error::Error;
use std::fmt;

use crate::id::{QuantityId, UpdatableId};

/// Errors from the scheduler during `run_epoch()`.
///
/// Any of these aborts the epoch: tentative state is discarded and the
/// elapsed time does not advance.
#[derive(Clone, Debug, PartialEq)]
pub enum StepError {
    /// A module returned an error while computing its deltas.
    ModuleFailed {
        /// Name of the failing module.
        name: String,
        /// The underlying module error.
        reason: ModuleError,
    },
    /// Shrinking the step would take it below the configured floor.
    StepUnderflow {
        /// The step size that would have resulted.
        step: f64,
        /// The configured minimum step size.
        floor: f64,
    },
    /// The epoch was retried more often than the configured bound.
    RetryLimitExceeded {
        /// Number of step decreases performed in the epoch.
        retries: u32,
        /// The configured bound.
        limit: u32,
    },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModuleFailed { name, reason } => {
                write!(f, "module '{name}' failed: {reason}")
            }
            Self::StepUnderflow { step, floor } => {
                write!(f, "time step {step:e} fell below the minimum of {floor:e}")
            }
            Self::RetryLimitExceeded { retries, limit } => {
                write!(f, "epoch retried {retries} times (limit {limit})")
            }
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ModuleFailed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Errors from individual module execution.
///
/// Returned by `Module::compute_deltas()` and wrapped in
/// [`StepError::ModuleFailed`] by the scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModuleError {
    /// The module's computation failed.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A non-finite value was produced for a quantity.
    NanDetected {
        /// The updatable holding the quantity.
        updatable: UpdatableId,
        /// The quantity, if the value was a concentration.
        quantity: Option<QuantityId>,
    },
    /// A delta referenced an updatable that is not registered.
    UnknownUpdatable {
        /// The unknown id.
        updatable: UpdatableId,
    },
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
            Self::NanDetected {
                updatable,
                quantity,
            } => {
                write!(f, "NaN detected in updatable {updatable}")?;
                if let Some(q) = quantity {
                    write!(f, " for quantity {q}")?;
                }
                Ok(())
            }
            Self::UnknownUpdatable { updatable } => {
                write!(f, "unknown updatable {updatable}")
            }
        }
    }
}

impl Error for ModuleError {}
