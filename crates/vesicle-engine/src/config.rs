//! Simulation configuration, validation, and error types.
//!
//! [`SimulationConfig`] is the builder-input for constructing a
//! [`Scheduler`](crate::Scheduler). [`validate()`](SimulationConfig::validate)
//! checks structural invariants at startup; tolerances can later be
//! replaced through [`Scheduler::set_tolerances`](crate::Scheduler::set_tolerances),
//! which validates them again.

use std::error::Error;
use std::fmt;

use vesicle_core::Updatables;
use vesicle_module::Module;
use vesicle_space::SpatialLayer;

// ── Tolerances ─────────────────────────────────────────────────────

/// Error tolerances and numerical cutoffs of one simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    /// Largest accepted local numerical error of a module. Default: 0.01.
    pub local_numerical: f64,
    /// Largest accepted epoch-wide step-doubling error. Default: 0.01.
    pub global_numerical: f64,
    /// Local displacement tolerance. A module's deviation `d` violates
    /// when `d < 1 − local_displacement`. Default: 1.0, so only a move
    /// past the displacement cutoff violates.
    pub local_displacement: f64,
    /// Global displacement tolerance, applied to the summed displacement
    /// of every module. A deviation `d` violates when
    /// `d < 1 − global_displacement`. Default: 0.8.
    pub global_displacement: f64,
    /// Concentrations below this magnitude report no step-doubling
    /// error. Default: 1e-12.
    pub negligence_cutoff: f64,
    /// Global numerical errors above this value are logged as unstable.
    /// Default: 10.0.
    pub instability_cutoff: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            local_numerical: 0.01,
            global_numerical: 0.01,
            local_displacement: 1.0,
            global_displacement: 0.8,
            negligence_cutoff: 1e-12,
            instability_cutoff: 10.0,
        }
    }
}

impl Tolerances {
    /// Check that every value is finite and in range.
    ///
    /// Numerical tolerances must be positive; displacement tolerances
    /// must lie in `(0, 2]`; the cutoffs must be non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("local_numerical", self.local_numerical),
            ("global_numerical", self.global_numerical),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }
        let displacement = [
            ("local_displacement", self.local_displacement),
            ("global_displacement", self.global_displacement),
        ];
        for (name, value) in displacement {
            if !value.is_finite() || value <= 0.0 || value > 2.0 {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }
        let cutoffs = [
            ("negligence_cutoff", self.negligence_cutoff),
            ("instability_cutoff", self.instability_cutoff),
        ];
        for (name, value) in cutoffs {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }
        Ok(())
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SimulationConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// No modules registered.
    NoModules,
    /// A tolerance or cutoff is out of range.
    InvalidTolerance {
        /// Which tolerance.
        name: &'static str,
        /// The invalid value.
        value: f64,
    },
    /// A step-size setting is NaN, infinite, zero, or negative.
    InvalidStep {
        /// Which setting.
        name: &'static str,
        /// The invalid value.
        value: f64,
    },
    /// `initial_step` lies outside `[min_step, max_step]`.
    StepOutOfBounds {
        /// The configured initial step.
        initial: f64,
        /// The configured floor.
        min: f64,
        /// The configured ceiling, if any.
        max: Option<f64>,
    },
    /// The displacement cutoff is NaN, infinite, zero, or negative.
    InvalidDisplacementCutoff {
        /// The invalid value.
        value: f64,
    },
    /// `max_epoch_retries` is zero.
    RetryLimitZero,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoModules => write!(f, "no modules registered"),
            Self::InvalidTolerance { name, value } => {
                write!(f, "tolerance {name} is out of range: {value}")
            }
            Self::InvalidStep { name, value } => {
                write!(f, "{name} must be finite and positive, got {value}")
            }
            Self::StepOutOfBounds { initial, min, max } => match max {
                Some(max) => write!(f, "initial_step {initial} outside [{min}, {max}]"),
                None => write!(f, "initial_step {initial} below min_step {min}"),
            },
            Self::InvalidDisplacementCutoff { value } => {
                write!(f, "displacement_cutoff must be finite and positive, got {value}")
            }
            Self::RetryLimitZero => write!(f, "max_epoch_retries must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

// ── SimulationConfig ───────────────────────────────────────────────

/// Complete configuration for constructing a scheduler.
pub struct SimulationConfig {
    /// Entities advanced by the modules, in inspection order.
    pub updatables: Updatables,
    /// Modules executed in registration order each pass.
    pub modules: Vec<Box<dyn Module>>,
    /// Error tolerances. Default: [`Tolerances::default()`].
    pub tolerances: Tolerances,
    /// Largest displacement a mobile entity may make in one epoch.
    /// Default: 1.0.
    pub displacement_cutoff: f64,
    /// Step size of the first epoch. Default: 0.1.
    pub initial_step: f64,
    /// Decreasing below this step is fatal. Default: 1e-12.
    pub min_step: f64,
    /// Increases are capped at this step. Default: `None` (uncapped).
    pub max_step: Option<f64>,
    /// Largest number of step decreases within one epoch. Default: 64.
    pub max_epoch_retries: u32,
    /// Collision geometry for mobile entities. Default: `None`.
    pub spatial: Option<SpatialLayer>,
}

impl SimulationConfig {
    /// A configuration with default tolerances and step settings.
    pub fn new(updatables: Updatables, modules: Vec<Box<dyn Module>>) -> Self {
        Self {
            updatables,
            modules,
            tolerances: Tolerances::default(),
            displacement_cutoff: 1.0,
            initial_step: 0.1,
            min_step: 1e-12,
            max_step: None,
            max_epoch_retries: 64,
            spatial: None,
        }
    }

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Must have at least one module.
        if self.modules.is_empty() {
            return Err(ConfigError::NoModules);
        }
        // 2. Tolerances.
        self.tolerances.validate()?;
        // 3. Step settings are finite and positive.
        let mut steps = vec![
            ("initial_step", self.initial_step),
            ("min_step", self.min_step),
        ];
        if let Some(max) = self.max_step {
            steps.push(("max_step", max));
        }
        for (name, value) in steps {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidStep { name, value });
            }
        }
        // 4. min_step <= initial_step <= max_step.
        let above_max = self.max_step.is_some_and(|max| self.initial_step > max);
        if self.initial_step < self.min_step || above_max {
            return Err(ConfigError::StepOutOfBounds {
                initial: self.initial_step,
                min: self.min_step,
                max: self.max_step,
            });
        }
        // 5. Displacement cutoff.
        if !self.displacement_cutoff.is_finite() || self.displacement_cutoff <= 0.0 {
            return Err(ConfigError::InvalidDisplacementCutoff {
                value: self.displacement_cutoff,
            });
        }
        // 6. Retry bound.
        if self.max_epoch_retries == 0 {
            return Err(ConfigError::RetryLimitZero);
        }
        Ok(())
    }
}

impl fmt::Debug for SimulationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationConfig")
            .field("updatables", &self.updatables.len())
            .field("modules", &self.modules.len())
            .field("tolerances", &self.tolerances)
            .field("displacement_cutoff", &self.displacement_cutoff)
            .field("initial_step", &self.initial_step)
            .field("min_step", &self.min_step)
            .field("max_step", &self.max_step)
            .field("max_epoch_retries", &self.max_epoch_retries)
            .field("spatial", &self.spatial.is_some())
            .finish()
    }
}
