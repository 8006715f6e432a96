//! Reference modules for Vesicle simulations.
//!
//! Provides kinetics modules that report a local numerical error through
//! per-module step-doubling, and displacement functions for use with
//! [`DisplacementModule`](vesicle_module::DisplacementModule).
//!
//! - [`FirstOrderReaction`]: `S → P` at rate `k`.
//! - [`ReversibleReaction`]: `S ⇌ P` at rates `kf` and `kb`.
//! - [`drift`] and [`brownian`]: displacement functions.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod kinetics;
pub mod motion;

pub use kinetics::{
    FirstOrderReaction, FirstOrderReactionBuilder, ReversibleReaction, ReversibleReactionBuilder,
};
pub use motion::{brownian, drift};
