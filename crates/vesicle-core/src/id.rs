//! Strongly-typed identifiers.

use std::fmt;

/// Identifies an updatable entity (compartment or mobile particle).
///
/// Assigned during simulation setup and stable for the lifetime of the
/// simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UpdatableId(pub u32);

impl fmt::Display for UpdatableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for UpdatableId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a module within a simulation.
///
/// The scheduler assigns sequential IDs in registration order:
/// `ModuleId(n)` is the n-th module of the configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ModuleId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a tracked quantity (a chemical entity's concentration).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuantityId(pub u32);

impl fmt::Display for QuantityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for QuantityId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing epoch counter.
///
/// Incremented each time an epoch commits. Retried attempts share the
/// id of the epoch they eventually commit as.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EpochId(pub u64);

impl EpochId {
    /// The id following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for EpochId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EpochId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
