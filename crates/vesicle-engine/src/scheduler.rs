//! The epoch scheduler: adaptive time stepping with rollback.
//!
//! [`Scheduler`] owns the updatables, the modules, the
//! [`TimeStepManager`] and the [`ErrorManager`], and drives the
//! [`EpochPhase`] machine once per [`run_epoch()`](Scheduler::run_epoch).
//!
//! # Retry protocol
//!
//! Every step decrease sends the epoch back to [`EpochPhase::Clear`],
//! which drops every pending delta and all tentative state before the
//! modules run again with the smaller step. A module whose local error
//! fails is first recomputed on its own, shrinking the step until it
//! succeeds, and then the whole epoch restarts. Decreases are bounded
//! by `max_epoch_retries` per epoch and by the step floor. A retry is one
//! decrease, so a recalculation that shrinks the step twice counts two
//! retries for a single restart.
//!
//! # Rollback
//!
//! When [`run_epoch()`](Scheduler::run_epoch) returns `Err`, all
//! tentative state of the epoch is discarded and the elapsed time is
//! unchanged. Step decreases already made in the failed epoch stay in
//! effect.

use std::fmt;
use std::time::Instant;

use tracing::{debug, trace};
use vesicle_core::{EpochId, ModuleId, NumericalError, StepError, Updatables};
use vesicle_module::{DeltaBuffer, EvaluationPhase, Module, ModuleState, StepContext};
use vesicle_space::SpatialLayer;

use crate::clock::{DecreaseReason, TimeStepEvent, TimeStepManager};
use crate::config::{ConfigError, SimulationConfig, Tolerances};
use crate::epoch::{EpochOutcome, EpochPhase};
use crate::error_manager::ErrorManager;
use crate::metrics::EpochMetrics;
use crate::{displacement, numerical};

// Compile-time assertion: Scheduler is Send.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Scheduler>();
    }
};

/// Single-threaded epoch scheduler.
///
/// Owns all simulation state and executes epochs synchronously. Each
/// `run_epoch()` call either commits one epoch, possibly after several
/// step decreases, or fails without committing anything.
pub struct Scheduler {
    updatables: Updatables,
    modules: Vec<Box<dyn Module>>,
    ids: Vec<ModuleId>,
    states: Vec<ModuleState>,
    clock: TimeStepManager,
    errors: ErrorManager,
    spatial: Option<SpatialLayer>,
    displacement_cutoff: f64,
    max_epoch_retries: u32,
    epoch: EpochId,
    full: DeltaBuffer,
    half: DeltaBuffer,
    last_metrics: EpochMetrics,
}

impl Scheduler {
    /// Construct a scheduler from a [`SimulationConfig`].
    ///
    /// Validates the configuration. Consumes the `SimulationConfig`.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let ids = (0u32..).take(config.modules.len()).map(ModuleId).collect();
        let states = vec![ModuleState::Pending; config.modules.len()];
        Ok(Self {
            updatables: config.updatables,
            modules: config.modules,
            ids,
            states,
            clock: TimeStepManager::new(config.initial_step, config.min_step, config.max_step),
            errors: ErrorManager::new(config.tolerances),
            spatial: config.spatial,
            displacement_cutoff: config.displacement_cutoff,
            max_epoch_retries: config.max_epoch_retries,
            epoch: EpochId::default(),
            full: DeltaBuffer::new(),
            half: DeltaBuffer::new(),
            last_metrics: EpochMetrics::default(),
        })
    }

    /// Run one epoch to commit.
    ///
    /// On `Err` the epoch is rolled back: pending deltas and tentative
    /// state are discarded, nothing is committed, and time does not
    /// advance.
    pub fn run_epoch(&mut self) -> Result<EpochOutcome, StepError> {
        let result = self.drive_epoch();
        if let Err(e) = &result {
            debug!(epoch = %self.epoch, error = %e, "epoch rolled back");
            self.discard();
        }
        result
    }

    fn drive_epoch(&mut self) -> Result<EpochOutcome, StepError> {
        let start = Instant::now();
        let epoch = self.epoch;
        let mut metrics = EpochMetrics::default();
        let mut retries = 0u32;
        let mut phase = EpochPhase::Clear;

        loop {
            trace!(%epoch, %phase, step = self.clock.step(), "epoch phase");
            phase = match phase {
                EpochPhase::Clear => {
                    self.clear();
                    metrics.attempts += 1;
                    EpochPhase::ModulesRun
                }
                EpochPhase::ModulesRun => {
                    for index in 0..self.modules.len() {
                        self.full_pass(index, epoch, &mut metrics)?;
                    }
                    EpochPhase::LocalCheck
                }
                EpochPhase::LocalCheck => {
                    if self.local_check(epoch, &mut retries, &mut metrics)? {
                        EpochPhase::GlobalSetup
                    } else {
                        EpochPhase::Clear
                    }
                }
                EpochPhase::GlobalSetup => {
                    self.updatables.apply_deltas();
                    let changed = self
                        .updatables
                        .iter()
                        .any(|u| !u.concentration_deltas().is_empty());
                    metrics.step_doubling_skipped = !changed;
                    if changed {
                        self.half_pass(EvaluationPhase::FirstHalf, epoch, &mut metrics)?;
                        numerical::setup(&mut self.updatables, &self.half);
                    }
                    EpochPhase::GlobalEvaluate
                }
                EpochPhase::GlobalEvaluate => {
                    let error = if metrics.step_doubling_skipped {
                        NumericalError::MINIMAL
                    } else {
                        self.half_pass(EvaluationPhase::SecondHalf, epoch, &mut metrics)?;
                        numerical::evaluate(
                            &self.updatables,
                            &self.half,
                            self.errors.tolerances().negligence_cutoff,
                        )
                    };
                    let deviation =
                        displacement::evaluate(&self.updatables, self.displacement_cutoff);

                    if !self.errors.evaluate_global_numerical(error) {
                        self.decrease(DecreaseReason::GlobalNumericalError, &mut retries)?;
                        metrics.global_decreases += 1;
                        EpochPhase::Clear
                    } else if !self.errors.evaluate_global_displacement(deviation) {
                        self.decrease(DecreaseReason::GlobalDisplacementDeviation, &mut retries)?;
                        metrics.global_decreases += 1;
                        EpochPhase::Clear
                    } else {
                        EpochPhase::Commit
                    }
                }
                EpochPhase::Commit => {
                    return Ok(self.commit(epoch, retries, metrics, start));
                }
            };
        }
    }

    // ── Passes ──────────────────────────────────────────────────────

    /// Run one module's full-step pass and move its deltas onto the
    /// updatables.
    fn full_pass(
        &mut self,
        index: usize,
        epoch: EpochId,
        metrics: &mut EpochMetrics,
    ) -> Result<(), StepError> {
        self.full.clear();
        let step = self.clock.step();
        self.run_module(index, EvaluationPhase::Full, step, epoch, metrics)?;
        let Self {
            full,
            updatables,
            modules,
            ..
        } = self;
        full.drain_into(updatables)
            .map_err(|reason| StepError::ModuleFailed {
                name: modules[index].name().to_string(),
                reason,
            })
    }

    /// Run every module at half the step into the half-step buffer.
    fn half_pass(
        &mut self,
        phase: EvaluationPhase,
        epoch: EpochId,
        metrics: &mut EpochMetrics,
    ) -> Result<(), StepError> {
        self.half.clear();
        let step = self.clock.step() / 2.0;
        for index in 0..self.modules.len() {
            self.run_module(index, phase, step, epoch, metrics)?;
        }
        Ok(())
    }

    fn run_module(
        &mut self,
        index: usize,
        phase: EvaluationPhase,
        step: f64,
        epoch: EpochId,
        metrics: &mut EpochMetrics,
    ) -> Result<(), StepError> {
        let Self {
            updatables,
            modules,
            ids,
            clock,
            full,
            half,
            displacement_cutoff,
            ..
        } = self;
        let buffer = match phase {
            EvaluationPhase::Full => full,
            EvaluationPhase::FirstHalf | EvaluationPhase::SecondHalf => half,
        };
        let module = &mut modules[index];
        let mut ctx = StepContext::new(
            updatables,
            buffer,
            ids[index],
            phase,
            epoch,
            step,
            clock.elapsed(),
            *displacement_cutoff,
        );

        let started = Instant::now();
        let result = module.compute_deltas(&mut ctx);
        metrics.record_module(module.name(), started.elapsed().as_micros() as u64);

        result.map_err(|reason| StepError::ModuleFailed {
            name: module.name().to_string(),
            reason,
        })
    }

    // ── Local check ─────────────────────────────────────────────────

    /// Judge every module's local error. Returns `false` if any module
    /// needed recalculation, in which case the step has already been
    /// decreased until that module succeeds.
    fn local_check(
        &mut self,
        epoch: EpochId,
        retries: &mut u32,
        metrics: &mut EpochMetrics,
    ) -> Result<bool, StepError> {
        let mut clean = true;
        for index in 0..self.modules.len() {
            let Some(mut reason) = self.judge_local(index) else {
                self.states[index] = ModuleState::SucceededWithPendingChanges;
                continue;
            };
            self.states[index] = ModuleState::RequiresRecalculation;
            clean = false;
            debug!(
                %epoch,
                module = self.modules[index].name(),
                %reason,
                "module requires recalculation"
            );

            while self.states[index] == ModuleState::RequiresRecalculation {
                let id = self.ids[index];
                for u in self.updatables.iter_mut() {
                    u.clear_deltas_from(id);
                }
                self.decrease(reason, retries)?;
                metrics.local_decreases += 1;
                self.full_pass(index, epoch, metrics)?;
                match self.judge_local(index) {
                    None => self.states[index] = ModuleState::SucceededWithPendingChanges,
                    Some(next) => reason = next,
                }
            }
        }
        Ok(clean)
    }

    fn judge_local(&mut self, index: usize) -> Option<DecreaseReason> {
        let local = self.modules[index].local_error();
        let numerical_ok = self.errors.evaluate_local_numerical(local.numerical);
        let displacement_ok = self.errors.evaluate_local_displacement(local.displacement);
        if !numerical_ok {
            Some(DecreaseReason::LocalNumericalError)
        } else if !displacement_ok {
            Some(DecreaseReason::LocalDisplacementDeviation)
        } else {
            None
        }
    }

    // ── State transitions ───────────────────────────────────────────

    fn decrease(&mut self, reason: DecreaseReason, retries: &mut u32) -> Result<(), StepError> {
        if *retries >= self.max_epoch_retries {
            return Err(StepError::RetryLimitExceeded {
                retries: *retries,
                limit: self.max_epoch_retries,
            });
        }
        *retries += 1;
        self.clock.decrease(reason)?;
        Ok(())
    }

    /// Drop pending deltas and tentative state.
    fn discard(&mut self) {
        self.updatables.clear_deltas();
        self.updatables.reset_next();
        self.full.clear();
        self.half.clear();
    }

    /// Start a fresh attempt.
    fn clear(&mut self) {
        self.discard();
        self.errors.reset_epoch();
        for (module, state) in self.modules.iter_mut().zip(self.states.iter_mut()) {
            module.on_reset();
            *state = ModuleState::Pending;
        }
    }

    fn commit(
        &mut self,
        epoch: EpochId,
        retries: u32,
        mut metrics: EpochMetrics,
        start: Instant,
    ) -> EpochOutcome {
        let step = self.clock.step();
        let collisions = match &self.spatial {
            Some(layer) => layer.apply_deltas(&mut self.updatables),
            None => Vec::new(),
        };
        for c in &collisions {
            debug!(%epoch, updatable = %c.updatable, kind = ?c.kind, "move rejected");
        }
        self.updatables.commit();
        self.clock.advance();
        self.errors.finish_epoch();
        for module in &mut self.modules {
            module.on_completion();
        }

        let increased = retries == 0
            && self.errors.all_errors_are_small()
            && self.clock.increase() > step;

        metrics.local_numerical_error = self.errors.local_numerical().value;
        metrics.global_numerical_error = self.errors.global_numerical().value;
        metrics.global_displacement_deviation = self.errors.global_displacement().value;
        metrics.collisions = collisions.len();
        metrics.total_us = start.elapsed().as_micros() as u64;
        self.last_metrics = metrics.clone();
        self.epoch = epoch.next();

        debug!(
            %epoch,
            step,
            retries,
            elapsed = self.clock.elapsed(),
            "epoch committed"
        );

        EpochOutcome {
            epoch,
            step,
            elapsed: self.clock.elapsed(),
            retries,
            next_step: self.clock.step(),
            increased,
            collisions,
            metrics,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// All updatables, holding committed state between epochs.
    pub fn updatables(&self) -> &Updatables {
        &self.updatables
    }

    /// Mutable access to the updatables between epochs.
    pub fn updatables_mut(&mut self) -> &mut Updatables {
        &mut self.updatables
    }

    /// The next epoch to run.
    pub fn current_epoch(&self) -> EpochId {
        self.epoch
    }

    /// Simulated time accumulated over committed epochs.
    pub fn elapsed(&self) -> f64 {
        self.clock.elapsed()
    }

    /// Step size the next epoch starts with.
    pub fn step(&self) -> f64 {
        self.clock.step()
    }

    /// The time-step manager.
    pub fn clock(&self) -> &TimeStepManager {
        &self.clock
    }

    /// The error manager, holding the verdicts of the last epoch.
    pub fn errors(&self) -> &ErrorManager {
        &self.errors
    }

    /// Replace the tolerances after validating them.
    pub fn set_tolerances(&mut self, tolerances: Tolerances) -> Result<(), ConfigError> {
        self.errors.set_tolerances(tolerances)
    }

    /// State of each module in registration order.
    pub fn module_states(&self) -> &[ModuleState] {
        &self.states
    }

    /// Names of the registered modules in registration order.
    pub fn module_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.modules.iter().map(|m| m.name())
    }

    /// Spatial layer, if configured.
    pub fn spatial(&self) -> Option<&SpatialLayer> {
        self.spatial.as_ref()
    }

    /// Metrics from the most recently committed epoch.
    pub fn last_metrics(&self) -> &EpochMetrics {
        &self.last_metrics
    }

    /// Register a callback for step changes. See
    /// [`TimeStepManager::on_event`].
    pub fn on_time_step_event<F>(&mut self, callback: F)
    where
        F: FnMut(&TimeStepEvent) + Send + 'static,
    {
        self.clock.on_event(callback);
    }

    /// Subscribe to step changes through a channel. See
    /// [`TimeStepManager::subscribe`].
    pub fn subscribe(&mut self) -> crossbeam_channel::Receiver<TimeStepEvent> {
        self.clock.subscribe()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("updatables", &self.updatables.len())
            .field("modules", &self.modules.len())
            .field("epoch", &self.epoch)
            .field("clock", &self.clock)
            .field("spatial", &self.spatial.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesicle_core::{DVec2, QuantityId};
    use vesicle_module::DisplacementModule;
    use vesicle_space::{Bounds, CollisionKind};
    use vesicle_test_utils::{
        compartment, concentration_of, particle, position_of, registry, ConstantDisplacement,
        ConstantRate, ExponentialDecay, FailingModule, GlobalErrorProbe, LocalErrorProbe, Record,
        RecordingModule,
    };

    const A: QuantityId = QuantityId(0);

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn scheduler(updatables: Updatables, modules: Vec<Box<dyn Module>>) -> Scheduler {
        Scheduler::new(SimulationConfig::new(updatables, modules)).unwrap()
    }

    #[test]
    fn clean_epoch_commits_and_grows() {
        let mut s = scheduler(
            registry([compartment(0, &[(0, 1.0)])]),
            vec![Box::new(ConstantRate::new("synth", A, 2.0))],
        );
        let out = s.run_epoch().unwrap();
        assert_eq!(out.epoch, EpochId(0));
        assert_eq!(out.retries, 0);
        assert!(out.increased);
        assert!(approx(out.step, 0.1));
        assert!(approx(out.next_step, 0.12));
        assert!(approx(s.elapsed(), 0.1));
        assert!(approx(concentration_of(s.updatables(), 0, 0), 1.2));
        assert_eq!(s.current_epoch(), EpochId(1));
        assert_eq!(
            s.module_states(),
            &[ModuleState::SucceededWithPendingChanges]
        );
    }

    #[test]
    fn global_error_within_tolerance_commits() {
        let mut s = scheduler(
            registry([compartment(0, &[(0, 1.0)])]),
            vec![Box::new(GlobalErrorProbe::new("probe", A, |_| 0.005))],
        );
        let out = s.run_epoch().unwrap();
        assert_eq!(out.retries, 0);
        assert!(approx(out.metrics.global_numerical_error, 0.005));
        // 0.005 < 0.8 * 0.01, so the step grows.
        assert!(out.increased);
        assert!(approx(s.step(), 0.12));
    }

    #[test]
    fn global_error_above_tolerance_retries_smaller() {
        let mut s = scheduler(
            registry([compartment(0, &[(0, 1.0)])]),
            vec![Box::new(GlobalErrorProbe::new("probe", A, |h| {
                if h > 0.09 {
                    0.02
                } else {
                    0.005
                }
            }))],
        );
        let out = s.run_epoch().unwrap();
        assert_eq!(out.retries, 1);
        assert_eq!(out.metrics.attempts, 2);
        assert_eq!(out.metrics.global_decreases, 1);
        assert!(approx(out.step, 0.08));
        // A retried epoch never grows the step.
        assert!(!out.increased);
        assert!(approx(s.elapsed(), 0.08));
        assert!(approx(concentration_of(s.updatables(), 0, 0), 1.08));
    }

    #[test]
    fn error_between_small_and_tolerance_keeps_step() {
        let mut s = scheduler(
            registry([compartment(0, &[(0, 1.0)])]),
            vec![Box::new(GlobalErrorProbe::new("probe", A, |_| 0.009))],
        );
        let out = s.run_epoch().unwrap();
        assert_eq!(out.retries, 0);
        assert!(!out.increased);
        assert!(approx(s.step(), 0.1));
    }

    #[test]
    fn decay_converges_to_acceptable_step() {
        let mut cfg = SimulationConfig::new(
            registry([compartment(0, &[(0, 1.0)])]),
            vec![Box::new(ExponentialDecay::new("decay", A, 1.0))],
        );
        cfg.initial_step = 0.3;
        let mut s = Scheduler::new(cfg).unwrap();
        let out = s.run_epoch().unwrap();
        // (kh)^2/4 / (1 - kh/2)^2 < 0.01 first holds at 0.3 * 0.8^3.
        assert_eq!(out.retries, 3);
        assert!(approx(out.step, 0.3 * 0.8f64.powi(3)));
        assert!(out.metrics.global_numerical_error <= 0.01);
    }

    #[test]
    fn local_failure_recalculates_then_restarts() {
        let (recorder, log) = RecordingModule::new("recorder");
        let mut s = scheduler(
            registry([compartment(0, &[(0, 1.0)])]),
            vec![
                Box::new(recorder),
                Box::new(LocalErrorProbe::new("local", |h| if h > 0.07 { 0.05 } else { 0.001 })),
            ],
        );
        let out = s.run_epoch().unwrap();
        // 0.1 → 0.08 → 0.064: two decreases, one restart.
        assert_eq!(out.retries, 2);
        assert_eq!(out.metrics.local_decreases, 2);
        assert_eq!(out.metrics.attempts, 2);
        assert!(approx(out.step, 0.064));

        let log = log.lock().unwrap();
        let full_steps: Vec<f64> = log
            .iter()
            .filter_map(|r| match r {
                Record::Compute {
                    phase: EvaluationPhase::Full,
                    step,
                    ..
                } => Some(*step),
                _ => None,
            })
            .collect();
        // The recorder only reruns after the restart.
        assert_eq!(full_steps.len(), 2);
        assert!(approx(full_steps[1], 0.064));
    }

    #[test]
    fn cleared_epoch_starts_without_pending_deltas() {
        let (recorder, log) = RecordingModule::new("recorder");
        let mut s = scheduler(
            registry([compartment(0, &[(0, 1.0)])]),
            vec![
                Box::new(GlobalErrorProbe::new("probe", A, |h| {
                    if h > 0.09 {
                        0.02
                    } else {
                        0.0
                    }
                })),
                Box::new(recorder),
            ],
        );
        s.run_epoch().unwrap();

        let log = log.lock().unwrap();
        let pending: Vec<usize> = log
            .iter()
            .filter_map(|r| match r {
                Record::Compute {
                    phase: EvaluationPhase::Full,
                    pending,
                    ..
                } => Some(*pending),
                _ => None,
            })
            .collect();
        // The probe's delta from the current pass only; nothing carried
        // over from the rejected attempt.
        assert_eq!(pending, vec![1, 1]);
        assert_eq!(log.iter().filter(|r| **r == Record::Reset).count(), 2);
        assert_eq!(log.iter().filter(|r| **r == Record::Completion).count(), 1);
    }

    #[test]
    fn displacement_without_movers_is_minimal() {
        let mut s = scheduler(
            registry([compartment(0, &[(0, 1.0)])]),
            vec![Box::new(ConstantDisplacement::new("push", DVec2::X))],
        );
        let out = s.run_epoch().unwrap();
        assert_eq!(out.metrics.global_displacement_deviation, 1.0);
        assert!(out.metrics.step_doubling_skipped);
    }

    #[test]
    fn global_displacement_violation_retries() {
        let mut s = scheduler(
            registry([particle(0, 0.0, 0.0, 0.1)]),
            // 0.1 * 9 = 0.9 moved, deviation 0.1 < 0.2.
            vec![Box::new(ConstantDisplacement::new("push", DVec2::new(9.0, 0.0)))],
        );
        let out = s.run_epoch().unwrap();
        assert_eq!(out.retries, 1);
        assert!(approx(out.step, 0.08));
        assert!(approx(position_of(s.updatables(), 0).unwrap().x, 0.72));
    }

    #[test]
    fn displacement_module_recalculates_then_restarts() {
        let mover = DisplacementModule::builder("drift")
            .always(|_, ctx| DVec2::new(12.0 * ctx.step(), 0.0))
            .build();
        let mut s = scheduler(registry([particle(0, 0.0, 0.0, 0.1)]), vec![Box::new(mover)]);
        let rx = s.subscribe();
        let out = s.run_epoch().unwrap();

        // 1.2 overshoots the cutoff locally; 0.96 leaves deviation 0.04,
        // below the global 0.2; 0.768 passes both.
        let events: Vec<_> = rx.try_iter().collect();
        match events.as_slice() {
            [TimeStepEvent::Decrease {
                step: a,
                reason: DecreaseReason::LocalDisplacementDeviation,
            }, TimeStepEvent::Decrease {
                step: b,
                reason: DecreaseReason::GlobalDisplacementDeviation,
            }] => {
                assert!(approx(*a, 0.08));
                assert!(approx(*b, 0.064));
            }
            _ => panic!("unexpected events: {events:?}"),
        }
        assert_eq!(out.retries, 2);
        assert_eq!(out.metrics.attempts, 3);
        assert_eq!(out.metrics.local_decreases, 1);
        assert_eq!(out.metrics.global_decreases, 1);
        assert!(approx(out.step, 0.064));
        assert!(approx(out.metrics.global_displacement_deviation, 0.232));
        assert!(approx(position_of(s.updatables(), 0).unwrap().x, 0.768));
        assert_eq!(
            s.module_states(),
            &[ModuleState::SucceededWithPendingChanges]
        );
    }

    #[test]
    fn module_failure_rolls_back() {
        let mut s = scheduler(
            registry([compartment(0, &[(0, 1.0)])]),
            vec![
                Box::new(ConstantRate::new("synth", A, 1.0)),
                Box::new(FailingModule::new("fail", 1)),
            ],
        );
        s.run_epoch().unwrap();
        let before = concentration_of(s.updatables(), 0, 0);
        let elapsed = s.elapsed();

        let err = s.run_epoch().unwrap_err();
        assert!(matches!(err, StepError::ModuleFailed { ref name, .. } if name == "fail"));
        assert_eq!(concentration_of(s.updatables(), 0, 0), before);
        assert_eq!(s.elapsed(), elapsed);
        assert_eq!(s.current_epoch(), EpochId(1));
        assert!(s.updatables().iter().all(|u| !u.has_pending_deltas()));
    }

    #[test]
    fn retry_limit_is_fatal() {
        let mut cfg = SimulationConfig::new(
            registry([compartment(0, &[(0, 1.0)])]),
            vec![Box::new(GlobalErrorProbe::new("probe", A, |_| 1.0))],
        );
        cfg.max_epoch_retries = 3;
        let mut s = Scheduler::new(cfg).unwrap();
        assert_eq!(
            s.run_epoch().unwrap_err(),
            StepError::RetryLimitExceeded {
                retries: 3,
                limit: 3
            }
        );
        assert_eq!(s.elapsed(), 0.0);
    }

    #[test]
    fn step_floor_is_fatal() {
        let mut cfg = SimulationConfig::new(
            registry([compartment(0, &[(0, 1.0)])]),
            vec![Box::new(GlobalErrorProbe::new("probe", A, |_| 1.0))],
        );
        cfg.min_step = 0.05;
        let mut s = Scheduler::new(cfg).unwrap();
        assert!(matches!(
            s.run_epoch().unwrap_err(),
            StepError::StepUnderflow { floor, .. } if floor == 0.05
        ));
    }

    #[test]
    fn collisions_snap_back_without_retry() {
        let mut cfg = SimulationConfig::new(
            registry([particle(0, 99.95, 0.0, 0.01), particle(1, 0.0, 0.0, 0.01)]),
            vec![Box::new(ConstantDisplacement::new("push", DVec2::new(1.0, 0.0)))],
        );
        cfg.spatial = Some(SpatialLayer::new(
            Bounds::new(DVec2::splat(-100.0), DVec2::splat(100.0)).unwrap(),
        ));
        let mut s = Scheduler::new(cfg).unwrap();
        let out = s.run_epoch().unwrap();
        assert_eq!(out.retries, 0);
        assert_eq!(out.collisions.len(), 1);
        assert_eq!(out.collisions[0].kind, CollisionKind::OutOfBounds);
        assert_eq!(out.metrics.collisions, 1);
        assert_eq!(position_of(s.updatables(), 0), Some(DVec2::new(99.95, 0.0)));
        assert!(approx(position_of(s.updatables(), 1).unwrap().x, 0.1));
    }

    #[test]
    fn events_reach_subscribers() {
        let mut s = scheduler(
            registry([compartment(0, &[(0, 1.0)])]),
            vec![Box::new(GlobalErrorProbe::new("probe", A, |h| {
                if h > 0.09 {
                    0.02
                } else {
                    0.001
                }
            }))],
        );
        let rx = s.subscribe();
        s.run_epoch().unwrap();
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            TimeStepEvent::Decrease {
                reason: DecreaseReason::GlobalNumericalError,
                ..
            }
        ));
    }

    #[test]
    fn set_tolerances_changes_verdict() {
        let mut s = scheduler(
            registry([compartment(0, &[(0, 1.0)])]),
            vec![Box::new(GlobalErrorProbe::new("probe", A, |_| 0.02))],
        );
        s.set_tolerances(Tolerances {
            global_numerical: 0.05,
            ..Tolerances::default()
        })
        .unwrap();
        let out = s.run_epoch().unwrap();
        assert_eq!(out.retries, 0);
    }
}
