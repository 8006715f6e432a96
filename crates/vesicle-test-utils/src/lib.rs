//! Test utilities and fixture modules for Vesicle development.
//!
//! Provides small [`Module`](vesicle_module::Module) implementations with
//! predictable deltas and errors (see [`fixtures`]) and helpers for
//! building updatable registries.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{
    ConstantDisplacement, ConstantRate, ExponentialDecay, FailingModule, GlobalErrorProbe,
    LocalErrorProbe, ModuleLog, Record, RecordingModule,
};

use vesicle_core::{DVec2, QuantityId, Updatable, UpdatableId, Updatables};

/// A compartment with the given `(quantity, value)` pairs.
pub fn compartment(id: u32, values: &[(u32, f64)]) -> Updatable {
    Updatable::compartment(
        UpdatableId(id),
        values.iter().map(|&(q, v)| (QuantityId(q), v)),
    )
}

/// A particle at `(x, y)` with the given radius.
pub fn particle(id: u32, x: f64, y: f64, radius: f64) -> Updatable {
    Updatable::particle(UpdatableId(id), DVec2::new(x, y), radius)
}

/// A registry holding `updatables` in order.
pub fn registry(updatables: impl IntoIterator<Item = Updatable>) -> Updatables {
    updatables.into_iter().collect()
}

/// Committed concentration of `quantity` in updatable `id`, or `NaN` if
/// the updatable does not exist.
pub fn concentration_of(updatables: &Updatables, id: u32, quantity: u32) -> f64 {
    updatables
        .get(UpdatableId(id))
        .map_or(f64::NAN, |u| u.concentration(QuantityId(quantity)))
}

/// Committed position of updatable `id`, if it is a particle.
pub fn position_of(updatables: &Updatables, id: u32) -> Option<DVec2> {
    updatables
        .get(UpdatableId(id))
        .and_then(|u| u.position())
        .map(|p| p.current)
}
