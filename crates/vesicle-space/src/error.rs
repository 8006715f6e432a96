//! Error types for geometry construction.

use glam::DVec2;
use std::fmt;

/// Errors arising from constructing static geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum SpaceError {
    /// The bounding rectangle has zero or negative extent on some axis.
    DegenerateBounds {
        /// Lower corner as given.
        min: DVec2,
        /// Upper corner as given.
        max: DVec2,
    },
    /// A membrane segment has zero length.
    DegenerateSegment {
        /// The coincident endpoint.
        point: DVec2,
    },
    /// A coordinate is NaN or infinite.
    NonFinite {
        /// Which input was not finite.
        what: String,
    },
}

impl fmt::Display for SpaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateBounds { min, max } => {
                write!(f, "bounds {min} .. {max} have no area")
            }
            Self::DegenerateSegment { point } => {
                write!(f, "segment at {point} has zero length")
            }
            Self::NonFinite { what } => write!(f, "{what} is not finite"),
        }
    }
}

impl std::error::Error for SpaceError {}
