//! Spatial layer for Vesicle simulations.
//!
//! Static geometry is supplied once at setup: a bounding rectangle
//! ([`Bounds`]) and membrane segments ([`Segment`]). The [`SpatialLayer`]
//! validates the tentative positions of mobile updatables against each
//! other and against that geometry before they are committed.
//!
//! Collision handling is local: a violating entity's tentative position
//! snaps back to its current position. It never triggers an epoch retry.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod geometry;
pub mod layer;

pub use error::SpaceError;
pub use geometry::{Bounds, Segment};
pub use layer::{CollisionKind, CollisionViolation, SpatialLayer};
