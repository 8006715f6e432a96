//! A module that moves mobile updatables by rule.
//!
//! A [`DisplacementModule`] holds an ordered list of rules, each a
//! predicate paired with a displacement function. Every rule whose
//! predicate matches a mobile updatable contributes one displacement
//! delta for it.

use glam::DVec2;
use vesicle_core::{DisplacementDeviation, ModuleError, Updatable, UpdatableId};

use crate::context::{EvaluationPhase, StepContext};
use crate::module::{LocalError, Module};

type Predicate = Box<dyn Fn(&Updatable) -> bool + Send>;
type DisplacementFn = Box<dyn Fn(&Updatable, &StepContext<'_>) -> DVec2 + Send>;

struct Rule {
    predicate: Predicate,
    displace: DisplacementFn,
}

/// Rule-driven displacement of mobile updatables.
///
/// The local verdict is the smallest `1 − |Σ delta| / cutoff` over the
/// entities this module displaced in its last full-step pass, where the
/// cutoff is the displacement cutoff carried by the [`StepContext`].
/// Half-step passes contribute nothing: positions do not take part in
/// step-doubling.
pub struct DisplacementModule {
    name: String,
    rules: Vec<Rule>,
    deviation: DisplacementDeviation,
}

impl DisplacementModule {
    /// Start building a module named `name`.
    pub fn builder(name: impl Into<String>) -> DisplacementModuleBuilder {
        DisplacementModuleBuilder {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Deviation measured by the last full-step pass.
    pub fn deviation(&self) -> DisplacementDeviation {
        self.deviation
    }
}

impl Module for DisplacementModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_deltas(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ModuleError> {
        if ctx.phase() != EvaluationPhase::Full {
            return Ok(());
        }

        let cutoff = ctx.displacement_cutoff();
        let updatables = ctx.updatables();
        let mut proposals: Vec<(UpdatableId, Vec<DVec2>)> = Vec::new();
        let mut deviations = Vec::new();

        for u in updatables.mobile() {
            let mut vectors = Vec::new();
            for rule in &self.rules {
                if (rule.predicate)(u) {
                    vectors.push((rule.displace)(u, ctx));
                }
            }
            if vectors.is_empty() {
                continue;
            }
            let total: DVec2 = vectors.iter().copied().sum();
            deviations.push(DisplacementDeviation::from_displacement(
                u.id(),
                total.length(),
                cutoff,
            ));
            proposals.push((u.id(), vectors));
        }

        for (id, vectors) in proposals {
            for v in vectors {
                ctx.add_displacement_delta(id, v)?;
            }
        }
        self.deviation = DisplacementDeviation::fold_min(deviations);
        Ok(())
    }

    fn local_error(&self) -> LocalError {
        LocalError {
            displacement: self.deviation,
            ..LocalError::NONE
        }
    }

    fn on_reset(&mut self) {
        self.deviation = DisplacementDeviation::MINIMAL;
    }
}

/// Builder for [`DisplacementModule`].
pub struct DisplacementModuleBuilder {
    name: String,
    rules: Vec<Rule>,
}

impl DisplacementModuleBuilder {
    /// Add a rule applied to every mobile updatable matching `predicate`.
    pub fn rule<P, F>(mut self, predicate: P, displace: F) -> Self
    where
        P: Fn(&Updatable) -> bool + Send + 'static,
        F: Fn(&Updatable, &StepContext<'_>) -> DVec2 + Send + 'static,
    {
        self.rules.push(Rule {
            predicate: Box::new(predicate),
            displace: Box::new(displace),
        });
        self
    }

    /// Add a rule applied to every mobile updatable.
    pub fn always<F>(self, displace: F) -> Self
    where
        F: Fn(&Updatable, &StepContext<'_>) -> DVec2 + Send + 'static,
    {
        self.rule(|_| true, displace)
    }

    /// Finish building.
    pub fn build(self) -> DisplacementModule {
        DisplacementModule {
            name: self.name,
            rules: self.rules,
            deviation: DisplacementDeviation::MINIMAL,
        }
    }
}

impl std::fmt::Debug for DisplacementModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplacementModule")
            .field("name", &self.name)
            .field("rules", &self.rules.len())
            .field("deviation", &self.deviation)
            .finish()
    }
}
