//! Epoch state machine phases and the result of a committed epoch.

use std::fmt;

use vesicle_core::EpochId;
use vesicle_space::CollisionViolation;

use crate::metrics::EpochMetrics;

/// Phase of the epoch state machine.
///
/// ```text
/// Clear → ModulesRun → LocalCheck → GlobalSetup → GlobalEvaluate → Commit
///   ↑                      │                           │
///   └──── step decrease ───┴───────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpochPhase {
    /// Drop pending deltas and tentative state; reset modules.
    Clear,
    /// Run every module's full-step pass.
    ModulesRun,
    /// Judge each module's local error, shrinking the step until every
    /// module succeeds.
    LocalCheck,
    /// Run the first half-step pass and write the interim state.
    GlobalSetup,
    /// Run the second half-step pass and judge the global errors.
    GlobalEvaluate,
    /// Resolve collisions, make tentative state current, advance time.
    Commit,
}

impl fmt::Display for EpochPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Clear => "clear",
            Self::ModulesRun => "modules-run",
            Self::LocalCheck => "local-check",
            Self::GlobalSetup => "global-setup",
            Self::GlobalEvaluate => "global-evaluate",
            Self::Commit => "commit",
        };
        f.write_str(s)
    }
}

/// Result of a committed epoch.
#[derive(Clone, Debug)]
pub struct EpochOutcome {
    /// The committed epoch.
    pub epoch: EpochId,
    /// Step size the committed attempt used.
    pub step: f64,
    /// Elapsed simulated time after the commit.
    pub elapsed: f64,
    /// Number of step decreases before the epoch committed.
    ///
    /// Counts decreases, not restarts: a local recalculation may decrease
    /// several times before the epoch returns to [`EpochPhase::Clear`].
    /// Attempts, the first included, are counted by
    /// [`EpochMetrics::attempts`].
    pub retries: u32,
    /// Step size for the next epoch, after any increase.
    pub next_step: f64,
    /// Whether the step grew after this epoch.
    pub increased: bool,
    /// Moves the spatial layer rejected.
    pub collisions: Vec<CollisionViolation>,
    /// Metrics for this epoch.
    pub metrics: EpochMetrics,
}

impl EpochOutcome {
    /// Whether the epoch committed on its first attempt.
    pub fn first_try(&self) -> bool {
        self.retries == 0
    }
}
