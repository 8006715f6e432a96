//! Numerical error measurements and the step-doubling estimate.

use std::cmp::Ordering;

use crate::id::{QuantityId, UpdatableId};

/// Severity of a numerical error, optionally tagged with its origin.
///
/// Ordering is total and considers only [`value`](Self::value); the tags
/// are diagnostics.
#[derive(Clone, Copy, Debug)]
pub struct NumericalError {
    /// Error severity (relative difference, non-negative).
    pub value: f64,
    /// Updatable the error was measured on.
    pub updatable: Option<UpdatableId>,
    /// Quantity the error was measured on.
    pub quantity: Option<QuantityId>,
}

impl NumericalError {
    /// "No error recorded": zero severity, no origin.
    pub const MINIMAL: Self = Self {
        value: 0.0,
        updatable: None,
        quantity: None,
    };

    /// An error measured on a specific quantity of an updatable.
    pub fn new(value: f64, updatable: UpdatableId, quantity: QuantityId) -> Self {
        Self {
            value,
            updatable: Some(updatable),
            quantity: Some(quantity),
        }
    }

    /// Whether this is the [`MINIMAL`](Self::MINIMAL) sentinel.
    pub fn is_minimal(&self) -> bool {
        self.value == 0.0 && self.updatable.is_none() && self.quantity.is_none()
    }

    /// The more severe of two errors. Ties keep `self`.
    pub fn max(self, other: Self) -> Self {
        if other > self {
            other
        } else {
            self
        }
    }
}

impl Default for NumericalError {
    fn default() -> Self {
        Self::MINIMAL
    }
}

impl PartialEq for NumericalError {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NumericalError {}

impl PartialOrd for NumericalError {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NumericalError {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.total_cmp(&other.value)
    }
}

/// Relative difference between a full-step `reference` and a
/// two-half-step `comparison` value.
///
/// Returns exactly `0.0` when both values are equal, and when the
/// comparison magnitude is below `negligence_cutoff` (the quantity is too
/// small for its relative error to matter). Returns `f64::INFINITY` when
/// either value is not finite, so that any tolerance check fails.
pub fn step_doubling_error(reference: f64, comparison: f64, negligence_cutoff: f64) -> f64 {
    if !reference.is_finite() || !comparison.is_finite() {
        return f64::INFINITY;
    }
    if reference == comparison {
        return 0.0;
    }
    let magnitude = comparison.abs();
    if magnitude < negligence_cutoff {
        return 0.0;
    }
    (reference - comparison).abs() / magnitude
}
