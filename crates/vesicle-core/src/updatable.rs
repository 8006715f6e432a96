//! The [`Updatable`] entity and its registry.
//!
//! An updatable is any entity whose state is advanced by modules: a
//! fixed-location compartment carrying concentrations, or a mobile
//! particle that additionally carries a position. Modules never mutate
//! an updatable directly; they contribute deltas which the scheduler
//! folds into the tentative state and commits once the epoch is
//! accepted.

use glam::DVec2;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::delta::{ConcentrationDelta, DisplacementDelta};
use crate::error::ModuleError;
use crate::id::{ModuleId, QuantityId, UpdatableId};
use crate::state::{ConcentrationState, PositionState};

/// An entity advanced by modules each epoch.
#[derive(Clone, Debug, PartialEq)]
pub struct Updatable {
    id: UpdatableId,
    concentrations: ConcentrationState,
    position: Option<PositionState>,
    concentration_deltas: SmallVec<[ConcentrationDelta; 4]>,
    displacement_deltas: SmallVec<[DisplacementDelta; 2]>,
}

impl Updatable {
    /// A fixed-location compartment with initial concentrations.
    pub fn compartment(
        id: UpdatableId,
        concentrations: impl IntoIterator<Item = (QuantityId, f64)>,
    ) -> Self {
        Self {
            id,
            concentrations: ConcentrationState::from_values(concentrations),
            position: None,
            concentration_deltas: SmallVec::new(),
            displacement_deltas: SmallVec::new(),
        }
    }

    /// A mobile particle at `position` with collision `radius`.
    pub fn particle(id: UpdatableId, position: DVec2, radius: f64) -> Self {
        Self {
            id,
            concentrations: ConcentrationState::new(),
            position: Some(PositionState::new(position, radius)),
            concentration_deltas: SmallVec::new(),
            displacement_deltas: SmallVec::new(),
        }
    }

    /// Attach initial concentrations (builder style).
    pub fn with_concentrations(
        mut self,
        concentrations: impl IntoIterator<Item = (QuantityId, f64)>,
    ) -> Self {
        for (q, v) in concentrations {
            self.concentrations.set(q, v);
        }
        self
    }

    /// Identity of this updatable.
    pub fn id(&self) -> UpdatableId {
        self.id
    }

    /// Concentration container.
    pub fn concentrations(&self) -> &ConcentrationState {
        &self.concentrations
    }

    /// Mutable concentration container.
    pub fn concentrations_mut(&mut self) -> &mut ConcentrationState {
        &mut self.concentrations
    }

    /// Committed concentration of `quantity`, or `0.0` if untracked.
    pub fn concentration(&self, quantity: QuantityId) -> f64 {
        self.concentrations.current(quantity).unwrap_or(0.0)
    }

    /// Position container, if this updatable is mobile.
    pub fn position(&self) -> Option<&PositionState> {
        self.position.as_ref()
    }

    /// Mutable position container, if this updatable is mobile.
    pub fn position_mut(&mut self) -> Option<&mut PositionState> {
        self.position.as_mut()
    }

    /// Whether this updatable carries a position.
    pub fn is_mobile(&self) -> bool {
        self.position.is_some()
    }

    /// Record a pending concentration change.
    pub fn add_concentration_delta(&mut self, delta: ConcentrationDelta) {
        self.concentration_deltas.push(delta);
    }

    /// Record a pending displacement.
    ///
    /// Fails if this updatable is not mobile.
    pub fn add_displacement_delta(&mut self, delta: DisplacementDelta) -> Result<(), ModuleError> {
        if self.position.is_none() {
            return Err(ModuleError::ExecutionFailed {
                reason: format!(
                    "module {} displaced immobile updatable {}",
                    delta.module, self.id
                ),
            });
        }
        self.displacement_deltas.push(delta);
        Ok(())
    }

    /// Pending concentration deltas of the running epoch.
    pub fn concentration_deltas(&self) -> &[ConcentrationDelta] {
        &self.concentration_deltas
    }

    /// Pending displacement deltas of the running epoch.
    pub fn displacement_deltas(&self) -> &[DisplacementDelta] {
        &self.displacement_deltas
    }

    /// Whether any module contributed a delta this epoch.
    pub fn has_pending_deltas(&self) -> bool {
        !self.concentration_deltas.is_empty() || !self.displacement_deltas.is_empty()
    }

    /// Drop every pending delta.
    pub fn clear_deltas(&mut self) {
        self.concentration_deltas.clear();
        self.displacement_deltas.clear();
    }

    /// Drop the pending displacement deltas, keeping concentration deltas.
    pub fn clear_displacement_deltas(&mut self) {
        self.displacement_deltas.clear();
    }

    /// Drop the pending deltas contributed by one module.
    pub fn clear_deltas_from(&mut self, module: ModuleId) {
        self.concentration_deltas.retain(|d| d.module != module);
        self.displacement_deltas.retain(|d| d.module != module);
    }

    /// Sum of all pending displacement vectors.
    pub fn total_displacement(&self) -> DVec2 {
        self.displacement_deltas
            .iter()
            .fold(DVec2::ZERO, |acc, d| acc + d.vector)
    }

    /// Sum of pending concentration deltas targeting `quantity`.
    pub fn total_concentration_delta(&self, quantity: QuantityId) -> f64 {
        self.concentration_deltas
            .iter()
            .filter(|d| d.quantity == quantity)
            .map(|d| d.value)
            .sum()
    }

    /// Fold the pending deltas into the tentative state.
    ///
    /// `next = current + Σ deltas` for every quantity touched by a delta
    /// and for the position of a mobile updatable. Untouched quantities
    /// keep `next == current`.
    pub fn apply_deltas(&mut self) {
        self.concentrations.reset_next();
        let mut sums: SmallVec<[(QuantityId, f64); 4]> = SmallVec::new();
        for d in &self.concentration_deltas {
            match sums.iter_mut().find(|(q, _)| *q == d.quantity) {
                Some((_, total)) => *total += d.value,
                None => sums.push((d.quantity, d.value)),
            }
        }
        for (q, total) in sums {
            let current = self.concentrations.current(q).unwrap_or(0.0);
            self.concentrations.set_next(q, current + total);
        }

        let displacement = self.total_displacement();
        if let Some(position) = self.position.as_mut() {
            position.next = position.current + displacement;
        }
    }

    /// Discard the tentative state.
    pub fn reset_next(&mut self) {
        self.concentrations.reset_next();
        if let Some(position) = self.position.as_mut() {
            position.reset_next();
        }
    }

    /// Make the tentative state authoritative and drop pending deltas.
    pub fn commit(&mut self) {
        self.concentrations.commit();
        if let Some(position) = self.position.as_mut() {
            position.commit();
        }
        self.clear_deltas();
    }
}

/// Ordered registry of updatables keyed by id.
///
/// Iteration follows insertion order, which is also the order the
/// spatial layer inspects mobile entities in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Updatables {
    entries: IndexMap<UpdatableId, Updatable>,
}

impl Updatables {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an updatable, replacing any previous one with the same id.
    pub fn insert(&mut self, updatable: Updatable) -> Option<Updatable> {
        self.entries.insert(updatable.id(), updatable)
    }

    /// Look up an updatable.
    pub fn get(&self, id: UpdatableId) -> Option<&Updatable> {
        self.entries.get(&id)
    }

    /// Look up an updatable mutably.
    pub fn get_mut(&mut self, id: UpdatableId) -> Option<&mut Updatable> {
        self.entries.get_mut(&id)
    }

    /// Updatable at a registry position.
    pub fn get_index(&self, index: usize) -> Option<&Updatable> {
        self.entries.get_index(index).map(|(_, u)| u)
    }

    /// Updatable at a registry position, mutably.
    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut Updatable> {
        self.entries.get_index_mut(index).map(|(_, u)| u)
    }

    /// Whether an id is registered.
    pub fn contains(&self, id: UpdatableId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of registered updatables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All updatables in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Updatable> {
        self.entries.values()
    }

    /// All updatables in registration order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Updatable> {
        self.entries.values_mut()
    }

    /// Mobile updatables in registration order.
    pub fn mobile(&self) -> impl Iterator<Item = &Updatable> {
        self.entries.values().filter(|u| u.is_mobile())
    }

    /// Drop the pending deltas of every updatable.
    pub fn clear_deltas(&mut self) {
        for u in self.entries.values_mut() {
            u.clear_deltas();
        }
    }

    /// Fold pending deltas into the tentative state of every updatable.
    pub fn apply_deltas(&mut self) {
        for u in self.entries.values_mut() {
            u.apply_deltas();
        }
    }

    /// Discard the tentative state of every updatable.
    pub fn reset_next(&mut self) {
        for u in self.entries.values_mut() {
            u.reset_next();
        }
    }

    /// Commit every updatable.
    pub fn commit(&mut self) {
        for u in self.entries.values_mut() {
            u.commit();
        }
    }
}

impl FromIterator<Updatable> for Updatables {
    fn from_iter<I: IntoIterator<Item = Updatable>>(iter: I) -> Self {
        let mut out = Self::new();
        for u in iter {
            out.insert(u);
        }
        out
    }
}
