//! The [`Module`] trait, its [`ModuleState`], and the [`LocalError`]
//! verdict a module reports after computing.

use crate::context::StepContext;
use vesicle_core::{DisplacementDeviation, ModuleError, NumericalError};

/// Where a module stands within the running epoch.
///
/// `Pending → (compute) → SucceededWithPendingChanges | RequiresRecalculation`.
/// A module requiring recalculation is recomputed after a step decrease
/// until it succeeds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModuleState {
    /// Not yet computed in this epoch attempt.
    #[default]
    Pending,
    /// Computed; deltas are pending commit.
    SucceededWithPendingChanges,
    /// Computed, but its local error exceeded tolerance.
    RequiresRecalculation,
}

/// Local error measurements of a module's most recent full-step pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalError {
    /// Largest local numerical error, or [`NumericalError::MINIMAL`].
    pub numerical: NumericalError,
    /// Most violating displacement deviation, or
    /// [`DisplacementDeviation::MAXIMAL_POSITIVE`] if nothing was measured.
    pub displacement: DisplacementDeviation,
}

impl LocalError {
    /// Nothing measured.
    pub const NONE: Self = Self {
        numerical: NumericalError::MINIMAL,
        displacement: DisplacementDeviation::MAXIMAL_POSITIVE,
    };
}

impl Default for LocalError {
    fn default() -> Self {
        Self::NONE
    }
}

/// A unit of computation contributing tentative deltas each epoch.
///
/// # Contract
///
/// - `compute_deltas()` reads only through the [`StepContext`] and is
///   deterministic given the context: identical committed state, step
///   size and phase yield identical deltas.
/// - During [`EvaluationPhase::Full`](crate::EvaluationPhase::Full)
///   passes the module records its local error, reported afterwards by
///   `local_error()`. Half-step passes must not overwrite it.
/// - `on_reset()` runs before every epoch attempt and `on_completion()`
///   once after the epoch commits.
///
/// # Object safety
///
/// This trait is object-safe; the scheduler stores modules as
/// `Vec<Box<dyn Module>>`.
///
/// # Examples
///
/// A module producing a constant synthesis of one quantity:
///
/// ```
/// use vesicle_core::{ModuleError, QuantityId};
/// use vesicle_module::{Module, StepContext};
///
/// struct Synthesis {
///     quantity: QuantityId,
///     rate: f64,
/// }
///
/// impl Module for Synthesis {
///     fn name(&self) -> &str { "synthesis" }
///
///     fn compute_deltas(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ModuleError> {
///         let updatables = ctx.updatables();
///         for u in updatables.iter() {
///             ctx.add_concentration_delta(u.id(), self.quantity, self.rate * ctx.step())?;
///         }
///         Ok(())
///     }
/// }
///
/// let module = Synthesis { quantity: QuantityId(0), rate: 1.0 };
/// assert_eq!(module.name(), "synthesis");
/// ```
pub trait Module: Send + 'static {
    /// Human-readable name for error reporting and metrics.
    fn name(&self) -> &str;

    /// Contribute tentative deltas for one pass.
    fn compute_deltas(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ModuleError>;

    /// Local error of the most recent full-step pass.
    ///
    /// Default: nothing measured.
    fn local_error(&self) -> LocalError {
        LocalError::NONE
    }

    /// Reset module-local accumulators before an epoch attempt.
    fn on_reset(&mut self) {}

    /// Observe a committed epoch.
    fn on_completion(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_pending() {
        assert_eq!(ModuleState::default(), ModuleState::Pending);
    }

    #[test]
    fn default_local_error_is_empty() {
        let e = LocalError::default();
        assert!(e.numerical.is_minimal());
        assert_eq!(e.displacement, DisplacementDeviation::MAXIMAL_POSITIVE);
    }
}
