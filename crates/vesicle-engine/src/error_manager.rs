//! Aggregation of the error verdicts of one epoch.

use tracing::warn;
use vesicle_core::{DisplacementDeviation, NumericalError};

use crate::config::{ConfigError, Tolerances};

/// Local numerical errors this many times larger than the previous
/// epoch's global error are accepted regardless of tolerance.
pub const NEGLIGIBLE_LOCAL_RATIO: f64 = 100_000.0;

/// Fraction of a numerical tolerance under which an error counts as small.
pub const SMALL_ERROR_FRACTION: f64 = 0.8;

/// Holds the tolerances and the worst values observed in the running
/// epoch.
///
/// Every `evaluate_*` method records its input (largest numerical error,
/// smallest displacement deviation) and returns whether it is acceptable.
#[derive(Clone, Debug)]
pub struct ErrorManager {
    tolerances: Tolerances,
    local_numerical: NumericalError,
    global_numerical: NumericalError,
    previous_global_numerical: NumericalError,
    local_displacement: DisplacementDeviation,
    global_displacement: DisplacementDeviation,
}

impl ErrorManager {
    /// A manager with nothing recorded.
    pub fn new(tolerances: Tolerances) -> Self {
        Self {
            tolerances,
            local_numerical: NumericalError::MINIMAL,
            global_numerical: NumericalError::MINIMAL,
            previous_global_numerical: NumericalError::MINIMAL,
            local_displacement: DisplacementDeviation::MINIMAL,
            global_displacement: DisplacementDeviation::MINIMAL,
        }
    }

    /// Active tolerances.
    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    /// Replace the tolerances after validating them.
    pub fn set_tolerances(&mut self, tolerances: Tolerances) -> Result<(), ConfigError> {
        tolerances.validate()?;
        self.tolerances = tolerances;
        Ok(())
    }

    /// Forget the measurements of a discarded epoch attempt.
    ///
    /// The previous committed epoch's global error survives.
    pub fn reset_epoch(&mut self) {
        self.local_numerical = NumericalError::MINIMAL;
        self.global_numerical = NumericalError::MINIMAL;
        self.local_displacement = DisplacementDeviation::MINIMAL;
        self.global_displacement = DisplacementDeviation::MINIMAL;
    }

    /// Record a module's local numerical error.
    ///
    /// Accepted when below the local tolerance, or when it is more than
    /// [`NEGLIGIBLE_LOCAL_RATIO`] times the previous epoch's global error.
    pub fn evaluate_local_numerical(&mut self, error: NumericalError) -> bool {
        self.local_numerical = self.local_numerical.max(error);
        if error.value < self.tolerances.local_numerical {
            return true;
        }
        let previous = self.previous_global_numerical.value;
        previous > 0.0 && error.value / previous > NEGLIGIBLE_LOCAL_RATIO
    }

    /// Record a module's local displacement deviation.
    pub fn evaluate_local_displacement(&mut self, deviation: DisplacementDeviation) -> bool {
        self.local_displacement = self.local_displacement.min(deviation);
        deviation.value >= 1.0 - self.tolerances.local_displacement
    }

    /// Record the epoch-wide step-doubling error.
    ///
    /// Rejected when it exceeds the global tolerance.
    pub fn evaluate_global_numerical(&mut self, error: NumericalError) -> bool {
        self.global_numerical = error;
        if error.value > self.tolerances.instability_cutoff {
            warn!(
                error = error.value,
                updatable = ?error.updatable,
                quantity = ?error.quantity,
                "numerical instability"
            );
        }
        error.value <= self.tolerances.global_numerical
    }

    /// Record the epoch-wide displacement deviation.
    pub fn evaluate_global_displacement(&mut self, deviation: DisplacementDeviation) -> bool {
        self.global_displacement = deviation;
        deviation.value >= 1.0 - self.tolerances.global_displacement
    }

    /// Whether both the global and the largest local numerical error are
    /// under [`SMALL_ERROR_FRACTION`] of their tolerances.
    pub fn all_errors_are_small(&self) -> bool {
        self.global_numerical.value < SMALL_ERROR_FRACTION * self.tolerances.global_numerical
            && self.local_numerical.value < SMALL_ERROR_FRACTION * self.tolerances.local_numerical
    }

    /// Keep this epoch's global error as the reference for the next
    /// epoch's local check.
    pub fn finish_epoch(&mut self) {
        self.previous_global_numerical = self.global_numerical;
    }

    /// Largest local numerical error recorded this epoch.
    pub fn local_numerical(&self) -> NumericalError {
        self.local_numerical
    }

    /// Global numerical error recorded this epoch.
    pub fn global_numerical(&self) -> NumericalError {
        self.global_numerical
    }

    /// Global numerical error of the last committed epoch.
    pub fn previous_global_numerical(&self) -> NumericalError {
        self.previous_global_numerical
    }

    /// Most violating local displacement deviation recorded this epoch.
    pub fn local_displacement(&self) -> DisplacementDeviation {
        self.local_displacement
    }

    /// Global displacement deviation recorded this epoch.
    pub fn global_displacement(&self) -> DisplacementDeviation {
        self.global_displacement
    }
}
