//! Collision checking and position commit for mobile updatables.

use glam::DVec2;
use vesicle_core::{UpdatableId, Updatables};

use crate::geometry::{Bounds, Segment};

/// What a rejected move ran into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollisionKind {
    /// The tentative position overlaps another mobile entity.
    Particle {
        /// The entity it would overlap.
        other: UpdatableId,
    },
    /// The path from current to tentative position crosses a membrane.
    Membrane {
        /// Index of the crossed segment in the layer.
        segment: usize,
    },
    /// The tentative position lies outside the simulation bounds.
    OutOfBounds,
}

/// A rejected move. The entity's tentative position was reset to its
/// current position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollisionViolation {
    /// The entity whose move was rejected.
    pub updatable: UpdatableId,
    /// The reason.
    pub kind: CollisionKind,
}

/// Static geometry plus the collision rules applied before commit.
///
/// # Ordering
///
/// Mobile entities are inspected in registry order, and a rejected
/// entity is snapped back before later entities are inspected. When two
/// moving entities would overlap, the one inspected first is reset.
/// A snap-back can put an entity back in the way of a move accepted
/// earlier in the same sweep, so sweeps repeat until one rejects
/// nothing. Every sweep that repeats resets at least one entity.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialLayer {
    bounds: Bounds,
    membranes: Vec<Segment>,
}

impl SpatialLayer {
    /// A layer with the given bounds and no membranes.
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            membranes: Vec::new(),
        }
    }

    /// Add a membrane segment (builder style).
    pub fn with_membrane(mut self, segment: Segment) -> Self {
        self.membranes.push(segment);
        self
    }

    /// Simulation bounds.
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Membrane segments.
    pub fn membranes(&self) -> &[Segment] {
        &self.membranes
    }

    /// Validate every mobile entity's tentative position.
    ///
    /// Checks, in order: overlap with every other mobile entity's
    /// tentative position, crossing of any membrane along the path from
    /// the current position, and containment in the bounds. The first
    /// violation found resets that entity's tentative position to its
    /// current position. Entities that do not move are not inspected.
    ///
    /// On return no accepted move overlaps any other entity's tentative
    /// position.
    pub fn check_for_collisions(&self, updatables: &mut Updatables) -> Vec<CollisionViolation> {
        let mut violations = Vec::new();
        loop {
            let rejected = violations.len();
            for index in 0..updatables.len() {
                let Some(kind) = self.find_violation(updatables, index) else {
                    continue;
                };
                if let Some(u) = updatables.get_index_mut(index) {
                    let id = u.id();
                    if let Some(position) = u.position_mut() {
                        position.reset_next();
                    }
                    violations.push(CollisionViolation {
                        updatable: id,
                        kind,
                    });
                }
            }
            if violations.len() == rejected {
                return violations;
            }
        }
    }

    /// Check collisions, then make every mobile entity's tentative
    /// position current and drop its displacement deltas.
    pub fn apply_deltas(&self, updatables: &mut Updatables) -> Vec<CollisionViolation> {
        let violations = self.check_for_collisions(updatables);
        for u in updatables.iter_mut() {
            if let Some(position) = u.position_mut() {
                position.commit();
                u.clear_displacement_deltas();
            }
        }
        violations
    }

    fn find_violation(&self, updatables: &Updatables, index: usize) -> Option<CollisionKind> {
        let me = updatables.get_index(index)?;
        let position = me.position()?;
        if position.next == position.current {
            return None;
        }

        for (other_index, other) in updatables.iter().enumerate() {
            if other_index == index {
                continue;
            }
            let Some(other_position) = other.position() else {
                continue;
            };
            if overlaps(
                position.next,
                position.radius,
                other_position.next,
                other_position.radius,
            ) {
                return Some(CollisionKind::Particle { other: other.id() });
            }
        }

        let path = Segment::path(position.current, position.next);
        if let Some(segment) = self.membranes.iter().position(|m| m.intersects(&path)) {
            return Some(CollisionKind::Membrane { segment });
        }

        if !self.bounds.contains(position.next) {
            return Some(CollisionKind::OutOfBounds);
        }
        None
    }
}

fn overlaps(a: DVec2, ra: f64, b: DVec2, rb: f64) -> bool {
    let reach = ra + rb;
    a.distance_squared(b) < reach * reach
}
