//! Pending changes contributed by modules during an epoch.
//!
//! Deltas are additive and order-independent: the tentative value of a
//! quantity is its current value plus the sum of every delta targeting
//! it, regardless of the order in which modules contributed them.

use glam::DVec2;

use crate::id::{ModuleId, QuantityId};

/// A change to one quantity of one updatable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConcentrationDelta {
    /// The contributing module.
    pub module: ModuleId,
    /// The quantity being changed.
    pub quantity: QuantityId,
    /// Signed change in concentration.
    pub value: f64,
}

impl ConcentrationDelta {
    /// Construct a new concentration delta.
    pub fn new(module: ModuleId, quantity: QuantityId, value: f64) -> Self {
        Self {
            module,
            quantity,
            value,
        }
    }
}

/// A change to the position of one mobile updatable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplacementDelta {
    /// The contributing module.
    pub module: ModuleId,
    /// Displacement vector.
    pub vector: DVec2,
}

impl DisplacementDelta {
    /// Construct a new displacement delta.
    pub fn new(module: ModuleId, vector: DVec2) -> Self {
        Self { module, vector }
    }
}
