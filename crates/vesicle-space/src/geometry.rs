//! Static geometry primitives: the simulation rectangle and membrane
//! segments.

use glam::DVec2;

use crate::error::SpaceError;

/// Axis-aligned bounding rectangle of the simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    min: DVec2,
    max: DVec2,
}

impl Bounds {
    /// Create a rectangle from its lower and upper corners.
    ///
    /// Fails if any coordinate is not finite or the rectangle has no area.
    pub fn new(min: DVec2, max: DVec2) -> Result<Self, SpaceError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(SpaceError::NonFinite {
                what: "bounds corner".to_string(),
            });
        }
        if min.x >= max.x || min.y >= max.y {
            return Err(SpaceError::DegenerateBounds { min, max });
        }
        Ok(Self { min, max })
    }

    /// Rectangle spanning `[0, width] × [0, height]`.
    pub fn from_size(width: f64, height: f64) -> Result<Self, SpaceError> {
        Self::new(DVec2::ZERO, DVec2::new(width, height))
    }

    /// Lower corner.
    pub fn min(&self) -> DVec2 {
        self.min
    }

    /// Upper corner.
    pub fn max(&self) -> DVec2 {
        self.max
    }

    /// Whether `point` lies inside the rectangle (edges inclusive).
    pub fn contains(&self, point: DVec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}

/// A straight membrane or boundary segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    start: DVec2,
    end: DVec2,
}

impl Segment {
    /// Create a segment between two distinct points.
    pub fn new(start: DVec2, end: DVec2) -> Result<Self, SpaceError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(SpaceError::NonFinite {
                what: "segment endpoint".to_string(),
            });
        }
        if start == end {
            return Err(SpaceError::DegenerateSegment { point: start });
        }
        Ok(Self { start, end })
    }

    /// Create a segment without validation. A zero-length segment is
    /// treated as a point.
    pub(crate) fn path(start: DVec2, end: DVec2) -> Self {
        Self { start, end }
    }

    /// Start point.
    pub fn start(&self) -> DVec2 {
        self.start
    }

    /// End point.
    pub fn end(&self) -> DVec2 {
        self.end
    }

    /// Whether two segments share at least one point.
    ///
    /// Touching endpoints and collinear overlaps count as intersections.
    pub fn intersects(&self, other: &Segment) -> bool {
        let (p1, p2, p3, p4) = (self.start, self.end, other.start, other.end);
        let d1 = orientation(p3, p4, p1);
        let d2 = orientation(p3, p4, p2);
        let d3 = orientation(p1, p2, p3);
        let d4 = orientation(p1, p2, p4);

        if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
            && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
        {
            return true;
        }

        (d1 == 0.0 && on_segment(p3, p4, p1))
            || (d2 == 0.0 && on_segment(p3, p4, p2))
            || (d3 == 0.0 && on_segment(p1, p2, p3))
            || (d4 == 0.0 && on_segment(p1, p2, p4))
    }
}

/// Signed area of the triangle `(a, b, c)`; positive when counter-clockwise.
fn orientation(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

/// Whether `p`, known to be collinear with `a`–`b`, lies within its box.
fn on_segment(a: DVec2, b: DVec2, p: DVec2) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}
