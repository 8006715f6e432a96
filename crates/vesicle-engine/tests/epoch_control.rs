//! Integration test: step-size control across epochs.
//!
//! Drives the scheduler through several epochs and checks how the step
//! evolves, what listeners observe, and that a stop request or a module
//! failure leaves committed state consistent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use vesicle_core::{ModuleError, QuantityId, StepError};
use vesicle_engine::{DecreaseReason, Scheduler, Simulation, SimulationConfig, TimeStepEvent};
use vesicle_module::{Module, StepContext};
use vesicle_test_utils::{
    compartment, concentration_of, registry, ConstantRate, ExponentialDecay, GlobalErrorProbe,
};

const A: QuantityId = QuantityId(0);

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ── NaN-producing module ─────────────────────────────────────────────

/// Writes a NaN delta on the epoch given by `fail_at`.
struct NanOnEpoch {
    fail_at: u64,
}

impl Module for NanOnEpoch {
    fn name(&self) -> &str {
        "nan"
    }

    fn compute_deltas(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ModuleError> {
        let value = if ctx.epoch().0 == self.fail_at {
            f64::NAN
        } else {
            ctx.step()
        };
        for u in ctx.updatables().iter() {
            ctx.add_concentration_delta(u.id(), A, value)?;
        }
        Ok(())
    }
}

// ── Events ───────────────────────────────────────────────────────────

#[test]
fn listeners_see_events_in_order() {
    let config = SimulationConfig::new(
        registry([compartment(0, &[(0, 1.0)])]),
        vec![Box::new(GlobalErrorProbe::new("probe", A, |h| {
            if h > 0.07 {
                0.02
            } else {
                0.001
            }
        }))],
    );
    let mut scheduler = Scheduler::new(config).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let first = Arc::clone(&seen);
    scheduler.on_time_step_event(move |e| first.lock().unwrap().push(("first", *e)));
    let second = Arc::clone(&seen);
    scheduler.on_time_step_event(move |e| second.lock().unwrap().push(("second", *e)));
    let rx = scheduler.subscribe();

    let out = scheduler.run_epoch().unwrap();
    assert_eq!(out.retries, 2);
    assert!(!out.increased);
    let out = scheduler.run_epoch().unwrap();
    assert_eq!(out.retries, 0);
    assert!(out.increased);

    let seen = seen.lock().unwrap();
    let tags: Vec<&str> = seen.iter().map(|(tag, _)| *tag).collect();
    assert_eq!(
        tags,
        vec!["first", "second", "first", "second", "first", "second"]
    );

    let events: Vec<TimeStepEvent> = rx.try_iter().collect();
    assert_eq!(events.len(), 3);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(seen[2 * i].1, *event);
    }
    match events.as_slice() {
        [TimeStepEvent::Decrease {
            step: a,
            reason: DecreaseReason::GlobalNumericalError,
        }, TimeStepEvent::Decrease { step: b, .. }, TimeStepEvent::Increase { step: c }] => {
            assert!(approx(*a, 0.08));
            assert!(approx(*b, 0.064));
            assert!(approx(*c, 0.0768));
        }
        _ => panic!("unexpected events: {events:?}"),
    }
}

#[test]
fn dropped_subscriber_is_pruned() {
    let mut scheduler = Scheduler::new(SimulationConfig::new(
        registry([compartment(0, &[(0, 1.0)])]),
        vec![Box::new(ConstantRate::new("synth", A, 1.0))],
    ))
    .unwrap();
    let kept = scheduler.subscribe();
    drop(scheduler.subscribe());
    scheduler.run_epoch().unwrap();
    scheduler.run_epoch().unwrap();
    assert_eq!(kept.try_iter().count(), 2);
}

#[test]
fn step_growth_stops_at_ceiling() {
    let mut config = SimulationConfig::new(
        registry([compartment(0, &[(0, 1.0)])]),
        vec![Box::new(ConstantRate::new("synth", A, 1.0))],
    );
    config.max_step = Some(0.13);
    let mut scheduler = Scheduler::new(config).unwrap();
    let rx = scheduler.subscribe();

    let steps: Vec<f64> = (0..4)
        .map(|_| scheduler.run_epoch().unwrap().step)
        .collect();
    assert!(approx(steps[0], 0.1));
    assert!(approx(steps[1], 0.12));
    assert!(approx(steps[2], 0.13));
    assert!(approx(steps[3], 0.13));
    assert_eq!(scheduler.clock().increases(), 2);
    assert_eq!(rx.try_iter().count(), 2);
}

// ── Stop and failure ────────────────────────────────────────────────

#[test]
fn stop_request_takes_effect_at_epoch_boundary() {
    let mut sim = Simulation::new(SimulationConfig::new(
        registry([compartment(0, &[(0, 1.0)])]),
        vec![Box::new(ConstantRate::new("synth", A, 1.0))],
    ))
    .unwrap();
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    sim.scheduler_mut().on_time_step_event(move |e| {
        if matches!(e, TimeStepEvent::Increase { .. }) {
            flag.store(true, Ordering::Relaxed);
        }
    });

    let summary = sim.run_epochs(10, &stop).unwrap();
    assert!(summary.stopped);
    assert_eq!(summary.epochs, 1);
    assert!(approx(summary.elapsed, 0.1));
    assert!(approx(summary.step, 0.12));
}

#[test]
fn nan_rolls_back_epoch() {
    let mut scheduler = Scheduler::new(SimulationConfig::new(
        registry([compartment(0, &[(0, 1.0)]), compartment(1, &[(0, 2.0)])]),
        vec![Box::new(NanOnEpoch { fail_at: 1 })],
    ))
    .unwrap();
    scheduler.run_epoch().unwrap();
    let elapsed = scheduler.elapsed();
    let step = scheduler.step();

    let err = scheduler.run_epoch().unwrap_err();
    match err {
        StepError::ModuleFailed { name, reason } => {
            assert_eq!(name, "nan");
            assert!(matches!(reason, ModuleError::NanDetected { .. }));
        }
        other => panic!("expected ModuleFailed, got {other:?}"),
    }
    assert_eq!(scheduler.elapsed(), elapsed);
    assert_eq!(scheduler.step(), step);
    assert!(approx(concentration_of(scheduler.updatables(), 0, 0), 1.1));
    assert!(approx(concentration_of(scheduler.updatables(), 1, 0), 2.1));
    for u in scheduler.updatables().iter() {
        assert!(!u.has_pending_deltas());
        assert_eq!(u.concentrations().next(A), u.concentrations().current(A));
    }
}

#[test]
fn invalid_config_is_rejected() {
    let config = SimulationConfig::new(registry([compartment(0, &[(0, 1.0)])]), Vec::new());
    assert!(Simulation::new(config).is_err());
}

// ── Properties ──────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn committed_epochs_respect_tolerance(rate in 0.1f64..5.0, initial in 0.01f64..0.5) {
        let mut config = SimulationConfig::new(
            registry([compartment(0, &[(0, 1.0)])]),
            vec![Box::new(ExponentialDecay::new("decay", A, rate))],
        );
        config.initial_step = initial;
        let mut scheduler = Scheduler::new(config).unwrap();

        let mut elapsed = 0.0;
        let mut previous = 1.0;
        for _ in 0..8 {
            let out = scheduler.run_epoch().unwrap();
            prop_assert!(out.metrics.global_numerical_error <= 0.01);
            prop_assert!(out.next_step <= out.step * 1.2 + 1e-12);
            elapsed += out.step;
            prop_assert!((out.elapsed - elapsed).abs() < 1e-9);

            let c = concentration_of(scheduler.updatables(), 0, 0);
            prop_assert!(c > 0.0 && c < previous);
            previous = c;
        }
    }
}
