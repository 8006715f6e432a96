//! Execution context passed to modules during an epoch pass.
//!
//! [`StepContext`] splits access the way the epoch needs it: a read-only
//! view of the updatables (committed state, or the half-step interim state
//! during the second half-step pass) and a mutable [`DeltaBuffer`] tagged
//! with the running module's id. Step size and elapsed time are plain
//! values, so modules cannot change them.

use glam::DVec2;
use vesicle_core::{
    ConcentrationDelta, DisplacementDelta, EpochId, ModuleError, ModuleId, QuantityId,
    UpdatableId, Updatables,
};

use crate::buffer::DeltaBuffer;

/// Which pass of the epoch is running.
///
/// Global numerical error is estimated by step-doubling: one full step is
/// compared with two consecutive half steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvaluationPhase {
    /// Full step from the committed state. Its deltas are the ones
    /// committed.
    Full,
    /// First half step from the committed state.
    FirstHalf,
    /// Second half step from the interim (first half-step) state.
    SecondHalf,
}

/// Execution context passed to each module's `compute_deltas()`.
pub struct StepContext<'a> {
    updatables: &'a Updatables,
    deltas: &'a mut DeltaBuffer,
    module: ModuleId,
    phase: EvaluationPhase,
    epoch: EpochId,
    step: f64,
    elapsed: f64,
    displacement_cutoff: f64,
}

impl<'a> StepContext<'a> {
    /// Construct a new step context.
    ///
    /// Typically called by the scheduler. `step` is the size of this
    /// pass: the full step, or half of it for half-step phases.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        updatables: &'a Updatables,
        deltas: &'a mut DeltaBuffer,
        module: ModuleId,
        phase: EvaluationPhase,
        epoch: EpochId,
        step: f64,
        elapsed: f64,
        displacement_cutoff: f64,
    ) -> Self {
        Self {
            updatables,
            deltas,
            module,
            phase,
            epoch,
            step,
            elapsed,
            displacement_cutoff,
        }
    }

    /// All updatables. Positions and committed concentrations are
    /// authoritative; use [`concentration()`](Self::concentration) for
    /// phase-aware concentration reads.
    pub fn updatables(&self) -> &'a Updatables {
        self.updatables
    }

    /// Concentration of `quantity` in `updatable` as seen by this pass.
    ///
    /// Full and first half-step passes see the committed value; the
    /// second half-step pass sees the interim value. Untracked quantities
    /// read as `0.0`.
    pub fn concentration(&self, updatable: UpdatableId, quantity: QuantityId) -> f64 {
        let Some(u) = self.updatables.get(updatable) else {
            return 0.0;
        };
        let state = u.concentrations();
        let value = match self.phase {
            EvaluationPhase::Full | EvaluationPhase::FirstHalf => state.current(quantity),
            EvaluationPhase::SecondHalf => state.interim(quantity),
        };
        value.unwrap_or(0.0)
    }

    /// Contribute a concentration change.
    pub fn add_concentration_delta(
        &mut self,
        updatable: UpdatableId,
        quantity: QuantityId,
        value: f64,
    ) -> Result<(), ModuleError> {
        if !self.updatables.contains(updatable) {
            return Err(ModuleError::UnknownUpdatable { updatable });
        }
        if !value.is_finite() {
            return Err(ModuleError::NanDetected {
                updatable,
                quantity: Some(quantity),
            });
        }
        self.deltas.push_concentration(
            updatable,
            ConcentrationDelta::new(self.module, quantity, value),
        );
        Ok(())
    }

    /// Contribute a displacement of a mobile updatable.
    pub fn add_displacement_delta(
        &mut self,
        updatable: UpdatableId,
        vector: DVec2,
    ) -> Result<(), ModuleError> {
        let target = self
            .updatables
            .get(updatable)
            .ok_or(ModuleError::UnknownUpdatable { updatable })?;
        if !target.is_mobile() {
            return Err(ModuleError::ExecutionFailed {
                reason: format!("updatable {updatable} is not mobile"),
            });
        }
        if !vector.is_finite() {
            return Err(ModuleError::NanDetected {
                updatable,
                quantity: None,
            });
        }
        self.deltas
            .push_displacement(updatable, DisplacementDelta::new(self.module, vector));
        Ok(())
    }

    /// Id of the running module.
    pub fn module_id(&self) -> ModuleId {
        self.module
    }

    /// Running pass.
    pub fn phase(&self) -> EvaluationPhase {
        self.phase
    }

    /// Epoch being computed.
    pub fn epoch(&self) -> EpochId {
        self.epoch
    }

    /// Step size of this pass.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Simulated time at the start of the epoch.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Maximum displacement allowed per epoch.
    pub fn displacement_cutoff(&self) -> f64 {
        self.displacement_cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesicle_core::Updatable;

    const A: QuantityId = QuantityId(0);

    fn registry() -> Updatables {
        let mut compartment = Updatable::compartment(UpdatableId(0), [(A, 1.0)]);
        compartment.concentrations_mut().set_interim(A, 0.5);
        [
            compartment,
            Updatable::particle(UpdatableId(1), DVec2::ZERO, 1.0),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn phase_selects_concentration_view() {
        let reg = registry();
        let mut buf = DeltaBuffer::new();
        let ctx = StepContext::new(
            &reg,
            &mut buf,
            ModuleId(0),
            EvaluationPhase::FirstHalf,
            EpochId(0),
            0.05,
            0.0,
            1.0,
        );
        assert_eq!(ctx.concentration(UpdatableId(0), A), 1.0);

        let mut buf = DeltaBuffer::new();
        let ctx = StepContext::new(
            &reg,
            &mut buf,
            ModuleId(0),
            EvaluationPhase::SecondHalf,
            EpochId(0),
            0.05,
            0.0,
            1.0,
        );
        assert_eq!(ctx.concentration(UpdatableId(0), A), 0.5);
        assert_eq!(ctx.concentration(UpdatableId(7), A), 0.0);
    }

    #[test]
    fn deltas_are_tagged_with_module() {
        let reg = registry();
        let mut buf = DeltaBuffer::new();
        {
            let mut ctx = StepContext::new(
                &reg,
                &mut buf,
                ModuleId(4),
                EvaluationPhase::Full,
                EpochId(2),
                0.1,
                1.0,
                1.0,
            );
            ctx.add_concentration_delta(UpdatableId(0), A, 0.1).unwrap();
            ctx.add_displacement_delta(UpdatableId(1), DVec2::X).unwrap();
            assert_eq!(ctx.epoch(), EpochId(2));
            assert_eq!(ctx.step(), 0.1);
        }
        assert_eq!(buf.concentration_deltas()[0].1.module, ModuleId(4));
        assert_eq!(buf.displacement_deltas()[0].1.module, ModuleId(4));
    }

    #[test]
    fn invalid_contributions_rejected() {
        let reg = registry();
        let mut buf = DeltaBuffer::new();
        let mut ctx = StepContext::new(
            &reg,
            &mut buf,
            ModuleId(0),
            EvaluationPhase::Full,
            EpochId(0),
            0.1,
            0.0,
            1.0,
        );
        assert_eq!(
            ctx.add_concentration_delta(UpdatableId(9), A, 1.0),
            Err(ModuleError::UnknownUpdatable {
                updatable: UpdatableId(9)
            })
        );
        assert!(matches!(
            ctx.add_concentration_delta(UpdatableId(0), A, f64::NAN),
            Err(ModuleError::NanDetected { .. })
        ));
        assert!(matches!(
            ctx.add_displacement_delta(UpdatableId(0), DVec2::X),
            Err(ModuleError::ExecutionFailed { .. })
        ));
    }
}
