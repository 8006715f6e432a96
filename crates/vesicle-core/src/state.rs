//! State containers holding the committed and tentative values of an
//! updatable.

use glam::DVec2;
use indexmap::IndexMap;

use crate::id::QuantityId;

/// Concentrations of an updatable in three slots.
///
/// - `current` is authoritative for every module until commit.
/// - `next` holds the tentative full-step result of the running epoch.
/// - `interim` holds the half-step snapshot used for step-doubling.
///
/// `next` and `interim` are written only by the scheduler's
/// error-estimation and commit steps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConcentrationState {
    current: IndexMap<QuantityId, f64>,
    next: IndexMap<QuantityId, f64>,
    interim: IndexMap<QuantityId, f64>,
}

impl ConcentrationState {
    /// An empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a container from initial concentrations.
    ///
    /// All three slots start out equal to the initial values.
    pub fn from_values(values: impl IntoIterator<Item = (QuantityId, f64)>) -> Self {
        let current: IndexMap<QuantityId, f64> = values.into_iter().collect();
        Self {
            next: current.clone(),
            interim: current.clone(),
            current,
        }
    }

    /// Committed concentration of a quantity.
    pub fn current(&self, quantity: QuantityId) -> Option<f64> {
        self.current.get(&quantity).copied()
    }

    /// Tentative concentration of a quantity.
    pub fn next(&self, quantity: QuantityId) -> Option<f64> {
        self.next.get(&quantity).copied()
    }

    /// Half-step concentration of a quantity.
    pub fn interim(&self, quantity: QuantityId) -> Option<f64> {
        self.interim.get(&quantity).copied()
    }

    /// Set the committed concentration, registering the quantity if needed.
    ///
    /// Intended for simulation setup; the tentative slots follow.
    pub fn set(&mut self, quantity: QuantityId, value: f64) {
        self.current.insert(quantity, value);
        self.next.insert(quantity, value);
        self.interim.insert(quantity, value);
    }

    /// Set the tentative concentration of a quantity.
    pub fn set_next(&mut self, quantity: QuantityId, value: f64) {
        self.next.insert(quantity, value);
    }

    /// Set the half-step concentration of a quantity.
    pub fn set_interim(&mut self, quantity: QuantityId, value: f64) {
        self.interim.insert(quantity, value);
    }

    /// Quantities tracked by this container, in insertion order.
    pub fn quantities(&self) -> impl Iterator<Item = QuantityId> + '_ {
        self.current.keys().copied()
    }

    /// Number of tracked quantities.
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Whether no quantity is tracked.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Discard tentative values: `next` and `interim` return to `current`.
    pub fn reset_next(&mut self) {
        self.next.clone_from(&self.current);
        self.interim.clone_from(&self.current);
    }

    /// Make the tentative values authoritative.
    pub fn commit(&mut self) {
        for (q, v) in &self.next {
            self.current.insert(*q, *v);
        }
        self.interim.clone_from(&self.current);
    }
}

/// Position of a mobile updatable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionState {
    /// Committed position.
    pub current: DVec2,
    /// Tentative position for the running epoch.
    pub next: DVec2,
    /// Collision radius.
    pub radius: f64,
}

impl PositionState {
    /// A resting position: `next` equals `current`.
    pub fn new(position: DVec2, radius: f64) -> Self {
        Self {
            current: position,
            next: position,
            radius,
        }
    }

    /// Snap the tentative position back to the committed one.
    pub fn reset_next(&mut self) {
        self.next = self.current;
    }

    /// Make the tentative position authoritative.
    pub fn commit(&mut self) {
        self.current = self.next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_values_fills_all_slots() {
        let s = ConcentrationState::from_values([(QuantityId(0), 1.5), (QuantityId(1), 2.0)]);
        assert_eq!(s.current(QuantityId(0)), Some(1.5));
        assert_eq!(s.next(QuantityId(0)), Some(1.5));
        assert_eq!(s.interim(QuantityId(1)), Some(2.0));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn tentative_values_do_not_leak_before_commit() {
        let mut s = ConcentrationState::from_values([(QuantityId(0), 1.0)]);
        s.set_next(QuantityId(0), 3.0);
        s.set_interim(QuantityId(0), 2.0);
        assert_eq!(s.current(QuantityId(0)), Some(1.0));

        s.reset_next();
        assert_eq!(s.next(QuantityId(0)), Some(1.0));
        assert_eq!(s.interim(QuantityId(0)), Some(1.0));
    }

    #[test]
    fn commit_promotes_next() {
        let mut s = ConcentrationState::from_values([(QuantityId(0), 1.0)]);
        s.set_next(QuantityId(0), 0.25);
        s.commit();
        assert_eq!(s.current(QuantityId(0)), Some(0.25));
        assert_eq!(s.interim(QuantityId(0)), Some(0.25));
    }

    #[test]
    fn position_reset_and_commit() {
        let mut p = PositionState::new(DVec2::new(1.0, 2.0), 0.5);
        p.next = DVec2::new(3.0, 2.0);
        p.reset_next();
        assert_eq!(p.next, p.current);

        p.next = DVec2::new(4.0, 4.0);
        p.commit();
        assert_eq!(p.current, DVec2::new(4.0, 4.0));
    }
}
