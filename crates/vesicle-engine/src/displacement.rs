//! Epoch-wide displacement deviation.

use vesicle_core::{DisplacementDeviation, Updatables};

/// Most violating `1 − |Σ delta| / cutoff` over the mobile updatables
/// with pending displacement deltas.
///
/// Sums the deltas of every module, so several modules that each stay
/// under the cutoff can still violate together. Yields
/// [`DisplacementDeviation::MINIMAL`] when nothing moved.
pub fn evaluate(updatables: &Updatables, cutoff: f64) -> DisplacementDeviation {
    DisplacementDeviation::fold_min(
        updatables
            .mobile()
            .filter(|u| !u.displacement_deltas().is_empty())
            .map(|u| {
                DisplacementDeviation::from_displacement(
                    u.id(),
                    u.total_displacement().length(),
                    cutoff,
                )
            }),
    )
}
