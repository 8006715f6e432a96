//! Epoch-wide numerical error by step-doubling.
//!
//! The scheduler runs every module three times per epoch attempt: one
//! full step from the committed state, a first half step from the
//! committed state, and a second half step from the interim state the
//! first half step produced. [`setup`] writes the interim state and
//! [`evaluate`] compares the full-step result with the two-half-step
//! result.

use smallvec::SmallVec;
use vesicle_core::{step_doubling_error, NumericalError, QuantityId, Updatables};
use vesicle_module::DeltaBuffer;

/// Write `interim = current + Σ first-half deltas` for every quantity
/// the first half step touched.
///
/// Untouched quantities keep `interim == current`, which the scheduler
/// guarantees by resetting tentative state at the start of each attempt.
pub fn setup(updatables: &mut Updatables, first_half: &DeltaBuffer) {
    for ((id, quantity), total) in first_half.concentration_totals() {
        if let Some(u) = updatables.get_mut(id) {
            let state = u.concentrations_mut();
            let current = state.current(quantity).unwrap_or(0.0);
            state.set_interim(quantity, current + total);
        }
    }
}

/// Largest step-doubling error over all updatables and quantities.
///
/// Expects every updatable's tentative `next` state to hold the
/// full-step result. The two-half-step result of a quantity is its
/// interim value plus the second-half deltas.
pub fn evaluate(
    updatables: &Updatables,
    second_half: &DeltaBuffer,
    negligence_cutoff: f64,
) -> NumericalError {
    let totals = second_half.concentration_totals();
    let mut worst = NumericalError::MINIMAL;

    for u in updatables.iter() {
        let id = u.id();
        let state = u.concentrations();

        let mut quantities: SmallVec<[QuantityId; 8]> = state.quantities().collect();
        for d in u.concentration_deltas() {
            if !quantities.contains(&d.quantity) {
                quantities.push(d.quantity);
            }
        }

        for quantity in quantities {
            let base = state.current(quantity).unwrap_or(0.0);
            let full = state.next(quantity).unwrap_or(base);
            let doubled = state.interim(quantity).unwrap_or(base)
                + totals.get(&(id, quantity)).copied().unwrap_or(0.0);
            let error = step_doubling_error(full, doubled, negligence_cutoff);
            worst = worst.max(NumericalError::new(error, id, quantity));
        }
    }
    worst
}
