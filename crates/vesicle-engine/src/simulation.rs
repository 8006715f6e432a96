//! Run loop around the [`Scheduler`].
//!
//! [`Simulation`] is the user-facing driver: it runs epochs until a
//! count, a simulated time, or an external stop request is reached, and
//! summarizes what happened in a [`RunSummary`].
//!
//! # Stopping
//!
//! The stop flag is read only between epochs. An epoch in progress,
//! including all of its retries, always runs to commit or failure.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, instrument};
use vesicle_core::StepError;

use crate::config::{ConfigError, SimulationConfig};
use crate::epoch::EpochOutcome;
use crate::scheduler::Scheduler;

// Compile-time assertion: Simulation is Send.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Simulation>();
    }
};

/// Totals over one call of [`Simulation::run_epochs`] or
/// [`Simulation::run_until`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    /// Epochs committed.
    pub epochs: u64,
    /// Step decreases over all committed epochs.
    pub retries: u64,
    /// Moves rejected by the spatial layer.
    pub collisions: u64,
    /// Simulated time after the last committed epoch.
    pub elapsed: f64,
    /// Step size the next epoch will start with.
    pub step: f64,
    /// Whether the run ended because the stop flag was set.
    pub stopped: bool,
}

impl RunSummary {
    fn record(&mut self, outcome: &EpochOutcome) {
        self.epochs += 1;
        self.retries += u64::from(outcome.retries);
        self.collisions += outcome.collisions.len() as u64;
        self.elapsed = outcome.elapsed;
        self.step = outcome.next_step;
    }
}

/// Epoch loop with stop handling.
///
/// # Example
///
/// ```ignore
/// let mut sim = Simulation::new(config)?;
/// let stop = AtomicBool::new(false);
/// let summary = sim.run_until(10.0, &stop)?;
/// println!("{} epochs, {} retries", summary.epochs, summary.retries);
/// ```
#[derive(Debug)]
pub struct Simulation {
    scheduler: Scheduler,
}

impl Simulation {
    /// Create a simulation from a [`SimulationConfig`].
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            scheduler: Scheduler::new(config)?,
        })
    }

    /// Run exactly one epoch.
    pub fn step(&mut self) -> Result<EpochOutcome, StepError> {
        self.scheduler.run_epoch()
    }

    /// Run up to `epochs` epochs, stopping early if `stop` is set.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`StepError`]. Epochs committed before
    /// the failure stay committed.
    #[instrument(skip(self, stop))]
    pub fn run_epochs(&mut self, epochs: u64, stop: &AtomicBool) -> Result<RunSummary, StepError> {
        let mut summary = self.empty_summary();
        for _ in 0..epochs {
            if stop.load(Ordering::Relaxed) {
                summary.stopped = true;
                break;
            }
            let outcome = self.scheduler.run_epoch()?;
            summary.record(&outcome);
        }
        self.log_summary(&summary);
        Ok(summary)
    }

    /// Run until the elapsed time reaches `end_time` or `stop` is set.
    ///
    /// The last epoch may overshoot `end_time`; the step is never cut
    /// short to land on it exactly.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`StepError`]. Epochs committed before
    /// the failure stay committed.
    #[instrument(skip(self, stop))]
    pub fn run_until(&mut self, end_time: f64, stop: &AtomicBool) -> Result<RunSummary, StepError> {
        let mut summary = self.empty_summary();
        while self.scheduler.elapsed() < end_time {
            if stop.load(Ordering::Relaxed) {
                summary.stopped = true;
                break;
            }
            let outcome = self.scheduler.run_epoch()?;
            summary.record(&outcome);
        }
        self.log_summary(&summary);
        Ok(summary)
    }

    /// The underlying scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Mutable access to the underlying scheduler.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    fn empty_summary(&self) -> RunSummary {
        RunSummary {
            elapsed: self.scheduler.elapsed(),
            step: self.scheduler.step(),
            ..RunSummary::default()
        }
    }

    fn log_summary(&self, summary: &RunSummary) {
        info!(
            epochs = summary.epochs,
            retries = summary.retries,
            collisions = summary.collisions,
            elapsed = summary.elapsed,
            step = summary.step,
            stopped = summary.stopped,
            "run finished"
        );
    }
}
