//! Per-pass accumulation of module contributions.
//!
//! The scheduler hands every module the same [`DeltaBuffer`] for one
//! pass. After a full-step pass the buffer is drained into the
//! updatables' pending-delta lists; after a half-step pass only its
//! concentration totals are read.

use indexmap::IndexMap;
use vesicle_core::{
    ConcentrationDelta, DisplacementDelta, ModuleError, QuantityId, UpdatableId, Updatables,
};

/// Deltas contributed during one pass, tagged by target updatable.
#[derive(Clone, Debug, Default)]
pub struct DeltaBuffer {
    concentration: Vec<(UpdatableId, ConcentrationDelta)>,
    displacement: Vec<(UpdatableId, DisplacementDelta)>,
}

impl DeltaBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a concentration delta.
    pub fn push_concentration(&mut self, updatable: UpdatableId, delta: ConcentrationDelta) {
        self.concentration.push((updatable, delta));
    }

    /// Record a displacement delta.
    pub fn push_displacement(&mut self, updatable: UpdatableId, delta: DisplacementDelta) {
        self.displacement.push((updatable, delta));
    }

    /// Drop all contributions.
    pub fn clear(&mut self) {
        self.concentration.clear();
        self.displacement.clear();
    }

    /// Whether nothing was contributed.
    pub fn is_empty(&self) -> bool {
        self.concentration.is_empty() && self.displacement.is_empty()
    }

    /// Whether any concentration delta was contributed.
    pub fn has_concentration_deltas(&self) -> bool {
        !self.concentration.is_empty()
    }

    /// Number of recorded deltas of both kinds.
    pub fn len(&self) -> usize {
        self.concentration.len() + self.displacement.len()
    }

    /// Recorded concentration deltas.
    pub fn concentration_deltas(&self) -> &[(UpdatableId, ConcentrationDelta)] {
        &self.concentration
    }

    /// Recorded displacement deltas.
    pub fn displacement_deltas(&self) -> &[(UpdatableId, DisplacementDelta)] {
        &self.displacement
    }

    /// Sum of concentration deltas per `(updatable, quantity)`, in first
    /// contribution order.
    pub fn concentration_totals(&self) -> IndexMap<(UpdatableId, QuantityId), f64> {
        let mut totals = IndexMap::new();
        for (id, d) in &self.concentration {
            *totals.entry((*id, d.quantity)).or_insert(0.0) += d.value;
        }
        totals
    }

    /// Move every recorded delta into its updatable's pending list.
    ///
    /// The buffer is left empty.
    pub fn drain_into(&mut self, updatables: &mut Updatables) -> Result<(), ModuleError> {
        for (id, delta) in self.concentration.drain(..) {
            updatables
                .get_mut(id)
                .ok_or(ModuleError::UnknownUpdatable { updatable: id })?
                .add_concentration_delta(delta);
        }
        for (id, delta) in self.displacement.drain(..) {
            updatables
                .get_mut(id)
                .ok_or(ModuleError::UnknownUpdatable { updatable: id })?
                .add_displacement_delta(delta)?;
        }
        Ok(())
    }
}
