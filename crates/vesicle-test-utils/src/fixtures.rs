//! Reusable module test fixtures.
//!
//! - [`ConstantRate`]: adds `rate · h` to a quantity.
//! - [`ExponentialDecay`]: adds `−k · c · h` to a quantity, no local error.
//! - [`ConstantDisplacement`]: moves every particle by `v · h`.
//! - [`GlobalErrorProbe`]: produces a chosen step-doubling error.
//! - [`LocalErrorProbe`]: reports a chosen local numerical error.
//! - [`FailingModule`]: fails deterministically after N full-step passes.
//! - [`RecordingModule`]: logs every hook and pass it sees.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vesicle_core::{DVec2, ModuleError, NumericalError, QuantityId, UpdatableId};
use vesicle_module::{EvaluationPhase, LocalError, Module, StepContext};

/// Adds `rate · h` to `quantity` in every updatable that tracks it.
pub struct ConstantRate {
    pub name: String,
    pub quantity: QuantityId,
    pub rate: f64,
}

impl ConstantRate {
    pub fn new(name: impl Into<String>, quantity: QuantityId, rate: f64) -> Self {
        Self {
            name: name.into(),
            quantity,
            rate,
        }
    }
}

impl Module for ConstantRate {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_deltas(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ModuleError> {
        let delta = self.rate * ctx.step();
        for u in ctx.updatables().iter() {
            if u.concentrations().current(self.quantity).is_some() {
                ctx.add_concentration_delta(u.id(), self.quantity, delta)?;
            }
        }
        Ok(())
    }
}

/// Explicit-Euler decay `−k · c · h` without a local error estimate, so
/// only the global step-doubling check constrains the step.
pub struct ExponentialDecay {
    pub name: String,
    pub quantity: QuantityId,
    pub rate: f64,
}

impl ExponentialDecay {
    pub fn new(name: impl Into<String>, quantity: QuantityId, rate: f64) -> Self {
        Self {
            name: name.into(),
            quantity,
            rate,
        }
    }
}

impl Module for ExponentialDecay {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_deltas(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ModuleError> {
        for u in ctx.updatables().iter() {
            if u.concentrations().current(self.quantity).is_none() {
                continue;
            }
            let c = ctx.concentration(u.id(), self.quantity);
            ctx.add_concentration_delta(u.id(), self.quantity, -self.rate * c * ctx.step())?;
        }
        Ok(())
    }
}

/// Moves every particle by `velocity · h` on full-step passes.
///
/// Reports no local deviation, so only the global displacement check
/// constrains the step.
pub struct ConstantDisplacement {
    pub name: String,
    pub velocity: DVec2,
}

impl ConstantDisplacement {
    pub fn new(name: impl Into<String>, velocity: DVec2) -> Self {
        Self {
            name: name.into(),
            velocity,
        }
    }
}

impl Module for ConstantDisplacement {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_deltas(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ModuleError> {
        if ctx.phase() != EvaluationPhase::Full {
            return Ok(());
        }
        let vector = self.velocity * ctx.step();
        for u in ctx.updatables().mobile() {
            ctx.add_displacement_delta(u.id(), vector)?;
        }
        Ok(())
    }
}

type ErrorCurve = Box<dyn Fn(f64) -> f64 + Send>;

/// Produces a step-doubling error of exactly `error(h)` on `quantity`.
///
/// The full step adds `h` to the committed value `c`. The two half steps
/// each add half of `(c + h) / (1 + e) − c`, so the two-half-step result
/// differs from the full-step result by the relative error `e`.
pub struct GlobalErrorProbe {
    pub name: String,
    pub quantity: QuantityId,
    error: ErrorCurve,
}

impl GlobalErrorProbe {
    pub fn new(
        name: impl Into<String>,
        quantity: QuantityId,
        error: impl Fn(f64) -> f64 + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            quantity,
            error: Box::new(error),
        }
    }
}

impl Module for GlobalErrorProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_deltas(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ModuleError> {
        let phase = ctx.phase();
        for u in ctx.updatables().iter() {
            let Some(c) = u.concentrations().current(self.quantity) else {
                continue;
            };
            let delta = match phase {
                EvaluationPhase::Full => ctx.step(),
                EvaluationPhase::FirstHalf | EvaluationPhase::SecondHalf => {
                    let h = 2.0 * ctx.step();
                    let e = (self.error)(h);
                    ((c + h) / (1.0 + e) - c) / 2.0
                }
            };
            ctx.add_concentration_delta(u.id(), self.quantity, delta)?;
        }
        Ok(())
    }
}

/// Reports a local numerical error of `error(h)` after every full-step
/// pass. Contributes no deltas.
pub struct LocalErrorProbe {
    pub name: String,
    error: ErrorCurve,
    last: NumericalError,
}

impl LocalErrorProbe {
    pub fn new(name: impl Into<String>, error: impl Fn(f64) -> f64 + Send + 'static) -> Self {
        Self {
            name: name.into(),
            error: Box::new(error),
            last: NumericalError::MINIMAL,
        }
    }
}

impl Module for LocalErrorProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_deltas(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ModuleError> {
        if ctx.phase() == EvaluationPhase::Full {
            let value = (self.error)(ctx.step());
            self.last = NumericalError::new(value, UpdatableId(0), QuantityId(0));
        }
        Ok(())
    }

    fn local_error(&self) -> LocalError {
        LocalError {
            numerical: self.last,
            ..LocalError::NONE
        }
    }

    fn on_reset(&mut self) {
        self.last = NumericalError::MINIMAL;
    }
}

/// Fails deterministically after a configurable number of full-step
/// passes. Contributes no deltas.
///
/// Uses `AtomicUsize` for the call counter so it can be inspected
/// through a shared handle.
pub struct FailingModule {
    pub name: String,
    pub succeed_count: usize,
    call_count: Arc<AtomicUsize>,
}

impl FailingModule {
    /// Create a module that succeeds `succeed_count` times then fails.
    pub fn new(name: impl Into<String>, succeed_count: usize) -> Self {
        Self {
            name: name.into(),
            succeed_count,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared handle to the full-step pass counter.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.call_count)
    }

    /// How many full-step passes have run.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl Module for FailingModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_deltas(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ModuleError> {
        if ctx.phase() != EvaluationPhase::Full {
            return Ok(());
        }
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(ModuleError::ExecutionFailed {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            });
        }
        Ok(())
    }
}

/// One observation of a [`RecordingModule`].
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    Reset,
    Compute {
        phase: EvaluationPhase,
        step: f64,
        /// Pending deltas on all updatables when the pass started.
        pending: usize,
    },
    Completion,
}

/// Shared log written by a [`RecordingModule`].
pub type ModuleLog = Arc<Mutex<Vec<Record>>>;

/// Logs every hook and pass. Contributes no deltas.
pub struct RecordingModule {
    pub name: String,
    log: ModuleLog,
}

impl RecordingModule {
    /// A recording module and the handle to its log.
    pub fn new(name: impl Into<String>) -> (Self, ModuleLog) {
        let log = ModuleLog::default();
        let module = Self {
            name: name.into(),
            log: Arc::clone(&log),
        };
        (module, log)
    }

    fn push(&self, record: Record) {
        if let Ok(mut log) = self.log.lock() {
            log.push(record);
        }
    }
}

impl Module for RecordingModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_deltas(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ModuleError> {
        let pending = ctx
            .updatables()
            .iter()
            .map(|u| u.concentration_deltas().len() + u.displacement_deltas().len())
            .sum();
        self.push(Record::Compute {
            phase: ctx.phase(),
            step: ctx.step(),
            pending,
        });
        Ok(())
    }

    fn on_reset(&mut self) {
        self.push(Record::Reset);
    }

    fn on_completion(&mut self) {
        self.push(Record::Completion);
    }
}
