//! Spatial displacement deviation.
//!
//! A deviation lives in "fraction of allowed displacement remaining"
//! space: `1.0` means the entity did not move, `0.0` means it moved
//! exactly the displacement cutoff, and negative values mean the cutoff
//! was exceeded.

use crate::id::UpdatableId;

/// How close a proposed move is to the allowed maximum displacement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplacementDeviation {
    /// Remaining fraction of the allowed displacement.
    pub value: f64,
    /// The mobile updatable the deviation was measured on.
    pub updatable: Option<UpdatableId>,
}

impl DisplacementDeviation {
    /// Best possible value. Identity of the minimum fold.
    pub const MAXIMAL_POSITIVE: Self = Self {
        value: f64::MAX,
        updatable: None,
    };

    /// No deviation: nothing moved.
    pub const MINIMAL: Self = Self {
        value: 1.0,
        updatable: None,
    };

    /// Worst possible value.
    pub const MAXIMAL_NEGATIVE: Self = Self {
        value: -f64::MAX,
        updatable: None,
    };

    /// Deviation of a move of length `displacement` against `cutoff`.
    pub fn from_displacement(updatable: UpdatableId, displacement: f64, cutoff: f64) -> Self {
        Self {
            value: 1.0 - displacement / cutoff,
            updatable: Some(updatable),
        }
    }

    /// The more violating of two deviations. Ties keep `self`.
    pub fn min(self, other: Self) -> Self {
        if other.value < self.value {
            other
        } else {
            self
        }
    }

    /// Whether the move exceeded the cutoff.
    pub fn is_violation(&self) -> bool {
        self.value < 0.0
    }

    /// Fraction of the allowed displacement that was used.
    pub fn consumed(&self) -> f64 {
        1.0 - self.value
    }

    /// Fold a sequence of deviations to the most violating one.
    ///
    /// An empty sequence yields [`MINIMAL`](Self::MINIMAL): no movement is
    /// trivially acceptable.
    pub fn fold_min(deviations: impl IntoIterator<Item = Self>) -> Self {
        let folded = deviations
            .into_iter()
            .fold(Self::MAXIMAL_POSITIVE, Self::min);
        if folded == Self::MAXIMAL_POSITIVE {
            Self::MINIMAL
        } else {
            folded
        }
    }
}

impl Default for DisplacementDeviation {
    fn default() -> Self {
        Self::MAXIMAL_POSITIVE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn resting_entity_has_full_allowance() {
        let d = DisplacementDeviation::from_displacement(UpdatableId(0), 0.0, 2.0);
        assert_eq!(d.value, 1.0);
        assert!(!d.is_violation());
    }

    #[test]
    fn exceeding_cutoff_is_violation() {
        let d = DisplacementDeviation::from_displacement(UpdatableId(0), 3.0, 2.0);
        assert_eq!(d.value, -0.5);
        assert!(d.is_violation());
        assert_eq!(d.consumed(), 1.5);
    }

    #[test]
    fn empty_fold_is_no_deviation() {
        assert_eq!(
            DisplacementDeviation::fold_min(std::iter::empty()),
            DisplacementDeviation::MINIMAL
        );
    }

    #[test]
    fn fold_picks_most_violating() {
        let folded = DisplacementDeviation::fold_min([
            DisplacementDeviation::from_displacement(UpdatableId(0), 0.5, 1.0),
            DisplacementDeviation::from_displacement(UpdatableId(1), 1.5, 1.0),
            DisplacementDeviation::from_displacement(UpdatableId(2), 0.1, 1.0),
        ]);
        assert_eq!(folded.updatable, Some(UpdatableId(1)));
        assert_eq!(folded.value, -0.5);
    }

    #[test]
    fn sentinels_are_ordered() {
        let (negative, minimal, positive) = (
            DisplacementDeviation::MAXIMAL_NEGATIVE,
            DisplacementDeviation::MINIMAL,
            DisplacementDeviation::MAXIMAL_POSITIVE,
        );
        assert!(negative.value < minimal.value);
        assert!(minimal.value < positive.value);
    }

    proptest! {
        #[test]
        fn fold_is_order_independent(lengths in proptest::collection::vec(0.0f64..5.0, 1..16)) {
            let devs: Vec<_> = lengths
                .iter()
                .enumerate()
                .map(|(i, &l)| {
                    DisplacementDeviation::from_displacement(UpdatableId(i as u32), l, 2.0)
                })
                .collect();
            let forward = DisplacementDeviation::fold_min(devs.iter().copied());
            let backward = DisplacementDeviation::fold_min(devs.iter().rev().copied());
            prop_assert_eq!(forward.value, backward.value);
        }
    }
}
