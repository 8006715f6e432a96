//! Simulated time and adaptive step size.
//!
//! [`TimeStepManager`] is owned by the [`Scheduler`](crate::Scheduler) and
//! lives exactly as long as the simulation, so there is no separate
//! initialization step. Step changes are announced as [`TimeStepEvent`]s,
//! delivered synchronously to registered callbacks in registration order
//! and then to channel subscribers.

use std::fmt;

use crossbeam_channel::{Receiver, Sender};
use tracing::debug;
use vesicle_core::StepError;

/// Factor applied by [`TimeStepManager::increase()`].
pub const INCREASE_FACTOR: f64 = 1.2;

/// Factor applied by [`TimeStepManager::decrease()`].
pub const DECREASE_FACTOR: f64 = 0.8;

/// Why the step was decreased.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecreaseReason {
    /// A module's local numerical error exceeded tolerance.
    LocalNumericalError,
    /// The epoch-wide step-doubling error exceeded tolerance.
    GlobalNumericalError,
    /// A module displaced an entity too far.
    LocalDisplacementDeviation,
    /// The summed displacement of an entity was too far.
    GlobalDisplacementDeviation,
}

impl fmt::Display for DecreaseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LocalNumericalError => "local numerical error",
            Self::GlobalNumericalError => "global numerical error",
            Self::LocalDisplacementDeviation => "local displacement deviation",
            Self::GlobalDisplacementDeviation => "global displacement deviation",
        };
        f.write_str(s)
    }
}

/// A step-size change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimeStepEvent {
    /// The step grew.
    Increase {
        /// New step size.
        step: f64,
    },
    /// The step shrank.
    Decrease {
        /// New step size.
        step: f64,
        /// What triggered the decrease.
        reason: DecreaseReason,
    },
}

type Listener = Box<dyn FnMut(&TimeStepEvent) + Send>;

/// Elapsed simulated time and current step size.
///
/// Modules only ever see the step through a read-only
/// [`StepContext`](vesicle_module::StepContext); the scheduler mutates
/// it between passes.
pub struct TimeStepManager {
    elapsed: f64,
    step: f64,
    min_step: f64,
    max_step: Option<f64>,
    increases: u64,
    decreases: u64,
    listeners: Vec<Listener>,
    subscribers: Vec<Sender<TimeStepEvent>>,
}

impl TimeStepManager {
    /// A manager at time zero with the given step and bounds.
    pub fn new(initial_step: f64, min_step: f64, max_step: Option<f64>) -> Self {
        Self {
            elapsed: 0.0,
            step: initial_step,
            min_step,
            max_step,
            increases: 0,
            decreases: 0,
            listeners: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Simulated time accumulated over committed epochs.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Current step size.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Step floor.
    pub fn min_step(&self) -> f64 {
        self.min_step
    }

    /// Step ceiling, if any.
    pub fn max_step(&self) -> Option<f64> {
        self.max_step
    }

    /// Number of increases so far.
    pub fn increases(&self) -> u64 {
        self.increases
    }

    /// Number of decreases so far.
    pub fn decreases(&self) -> u64 {
        self.decreases
    }

    /// Multiply the step by [`INCREASE_FACTOR`], capped at the ceiling.
    ///
    /// Returns the new step. Nothing happens, and no event is emitted,
    /// when the step already sits at the ceiling.
    pub fn increase(&mut self) -> f64 {
        let mut grown = self.step * INCREASE_FACTOR;
        if let Some(max) = self.max_step {
            grown = grown.min(max);
        }
        if grown <= self.step {
            return self.step;
        }
        self.step = grown;
        self.increases += 1;
        debug!(step = grown, "time step increased");
        self.emit(TimeStepEvent::Increase { step: grown });
        grown
    }

    /// Multiply the step by [`DECREASE_FACTOR`].
    ///
    /// Returns the new step, or [`StepError::StepUnderflow`] without
    /// changing anything if it would fall below the floor.
    pub fn decrease(&mut self, reason: DecreaseReason) -> Result<f64, StepError> {
        let shrunk = self.step * DECREASE_FACTOR;
        if shrunk < self.min_step {
            return Err(StepError::StepUnderflow {
                step: shrunk,
                floor: self.min_step,
            });
        }
        self.step = shrunk;
        self.decreases += 1;
        debug!(step = shrunk, %reason, "time step decreased");
        self.emit(TimeStepEvent::Decrease {
            step: shrunk,
            reason,
        });
        Ok(shrunk)
    }

    /// Add the current step to the elapsed time.
    pub fn advance(&mut self) {
        self.elapsed += self.step;
    }

    /// Register a callback for step changes.
    ///
    /// Callbacks run synchronously, in registration order, on the thread
    /// driving the scheduler.
    pub fn on_event<F>(&mut self, callback: F)
    where
        F: FnMut(&TimeStepEvent) + Send + 'static,
    {
        self.listeners.push(Box::new(callback));
    }

    /// Subscribe to step changes through an unbounded channel.
    ///
    /// Dropping the receiver unsubscribes at the next event.
    pub fn subscribe(&mut self) -> Receiver<TimeStepEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: TimeStepEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

impl fmt::Debug for TimeStepManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeStepManager")
            .field("elapsed", &self.elapsed)
            .field("step", &self.step)
            .field("min_step", &self.min_step)
            .field("max_step", &self.max_step)
            .field("increases", &self.increases)
            .field("decreases", &self.decreases)
            .field("listeners", &self.listeners.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
