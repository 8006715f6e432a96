//! Mass-action kinetics between two quantities.
//!
//! Both reactions integrate with explicit Euler: the delta of one pass is
//! `flux(s, p) * h`, moved from the substrate to the product. During the
//! full-step pass each reaction also estimates its own local error by
//! comparing that single Euler step with two half steps of the same
//! reaction in isolation.
//!
//! Constructed via the builder pattern: [`FirstOrderReaction::builder`] and
//! [`ReversibleReaction::builder`].

use vesicle_core::{step_doubling_error, ModuleError, NumericalError, QuantityId};
use vesicle_module::{EvaluationPhase, LocalError, Module, StepContext};

/// Default relative-error cutoff below which a concentration is ignored.
pub const DEFAULT_NEGLIGENCE_CUTOFF: f64 = 1e-12;

// ── Shared integration ──────────────────────────────────────────

/// Substrate/product pair plus the running local error.
#[derive(Clone, Debug)]
struct Pair {
    substrate: QuantityId,
    product: QuantityId,
    negligence_cutoff: f64,
    local: NumericalError,
}

impl Pair {
    /// Contribute `flux(s, p) * h` to every updatable tracking the
    /// substrate, recording the local error on full-step passes.
    fn compute(
        &mut self,
        ctx: &mut StepContext<'_>,
        flux: impl Fn(f64, f64) -> f64,
    ) -> Result<(), ModuleError> {
        let full = ctx.phase() == EvaluationPhase::Full;
        if full {
            self.local = NumericalError::MINIMAL;
        }
        let h = ctx.step();
        let updatables = ctx.updatables();

        for u in updatables.iter() {
            if u.concentrations().current(self.substrate).is_none() {
                continue;
            }
            let id = u.id();
            let s = ctx.concentration(id, self.substrate);
            let p = ctx.concentration(id, self.product);
            let moved = flux(s, p) * h;
            if !moved.is_finite() {
                return Err(ModuleError::NanDetected {
                    updatable: id,
                    quantity: Some(self.substrate),
                });
            }
            ctx.add_concentration_delta(id, self.substrate, -moved)?;
            ctx.add_concentration_delta(id, self.product, moved)?;

            if full {
                let (s_half, p_half) = two_half_steps(s, p, h, &flux);
                let cutoff = self.negligence_cutoff;
                let e_s = step_doubling_error(s - moved, s_half, cutoff);
                let e_p = step_doubling_error(p + moved, p_half, cutoff);
                self.local = self
                    .local
                    .max(NumericalError::new(e_s, id, self.substrate))
                    .max(NumericalError::new(e_p, id, self.product));
            }
        }
        Ok(())
    }
}

fn two_half_steps(s: f64, p: f64, h: f64, flux: &impl Fn(f64, f64) -> f64) -> (f64, f64) {
    let half = h / 2.0;
    let first = flux(s, p) * half;
    let (s1, p1) = (s - first, p + first);
    let second = flux(s1, p1) * half;
    (s1 - second, p1 + second)
}

fn validate_rate(name: &str, rate: f64) -> Result<(), String> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(format!("{name} must be finite and >= 0, got {rate}"));
    }
    Ok(())
}

fn validate_cutoff(cutoff: f64) -> Result<(), String> {
    if !cutoff.is_finite() || cutoff < 0.0 {
        return Err(format!(
            "negligence_cutoff must be finite and >= 0, got {cutoff}"
        ));
    }
    Ok(())
}

// ── FirstOrderReaction ──────────────────────────────────────────

/// Irreversible first-order conversion `S → P`.
///
/// Each pass contributes `-k·s·h` to the substrate and `+k·s·h` to the
/// product of every updatable that tracks the substrate.
///
/// ```
/// use vesicle_core::QuantityId;
/// use vesicle_modules::FirstOrderReaction;
///
/// let decay = FirstOrderReaction::builder()
///     .substrate(QuantityId(0))
///     .product(QuantityId(1))
///     .rate(0.5)
///     .build()
///     .unwrap();
/// assert_eq!(decay.rate(), 0.5);
/// ```
#[derive(Clone, Debug)]
pub struct FirstOrderReaction {
    name: String,
    pair: Pair,
    rate: f64,
}

/// Builder for [`FirstOrderReaction`].
///
/// Required fields: `substrate`, `product` and `rate`.
pub struct FirstOrderReactionBuilder {
    name: String,
    substrate: Option<QuantityId>,
    product: Option<QuantityId>,
    rate: Option<f64>,
    negligence_cutoff: f64,
}

impl FirstOrderReaction {
    /// Create a new builder.
    pub fn builder() -> FirstOrderReactionBuilder {
        FirstOrderReactionBuilder {
            name: "FirstOrderReaction".to_string(),
            substrate: None,
            product: None,
            rate: None,
            negligence_cutoff: DEFAULT_NEGLIGENCE_CUTOFF,
        }
    }

    /// Rate constant `k`.
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl FirstOrderReactionBuilder {
    /// Override the module name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Quantity consumed.
    pub fn substrate(mut self, quantity: QuantityId) -> Self {
        self.substrate = Some(quantity);
        self
    }

    /// Quantity produced.
    pub fn product(mut self, quantity: QuantityId) -> Self {
        self.product = Some(quantity);
        self
    }

    /// Rate constant `k` (per unit time). Must be >= 0.
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Concentrations below this magnitude report no local error
    /// (default: [`DEFAULT_NEGLIGENCE_CUTOFF`]).
    pub fn negligence_cutoff(mut self, cutoff: f64) -> Self {
        self.negligence_cutoff = cutoff;
        self
    }

    /// Build the module, validating all configuration.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a required field is missing, if substrate and
    /// product are the same quantity, or if a numeric parameter is
    /// negative or not finite.
    pub fn build(self) -> Result<FirstOrderReaction, String> {
        let substrate = self
            .substrate
            .ok_or_else(|| "substrate is required".to_string())?;
        let product = self
            .product
            .ok_or_else(|| "product is required".to_string())?;
        let rate = self.rate.ok_or_else(|| "rate is required".to_string())?;
        if substrate == product {
            return Err(format!("substrate and product must differ, both are {substrate}"));
        }
        validate_rate("rate", rate)?;
        validate_cutoff(self.negligence_cutoff)?;

        Ok(FirstOrderReaction {
            name: self.name,
            pair: Pair {
                substrate,
                product,
                negligence_cutoff: self.negligence_cutoff,
                local: NumericalError::MINIMAL,
            },
            rate,
        })
    }
}

impl Module for FirstOrderReaction {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_deltas(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ModuleError> {
        let k = self.rate;
        self.pair.compute(ctx, |s, _| k * s)
    }

    fn local_error(&self) -> LocalError {
        LocalError {
            numerical: self.pair.local,
            ..LocalError::NONE
        }
    }

    fn on_reset(&mut self) {
        self.pair.local = NumericalError::MINIMAL;
    }
}

// ── ReversibleReaction ──────────────────────────────────────────

/// Reversible conversion `S ⇌ P`.
///
/// Net flux per unit time is `kf·s − kb·p`; a negative net flux moves
/// material back to the substrate.
#[derive(Clone, Debug)]
pub struct ReversibleReaction {
    name: String,
    pair: Pair,
    forward: f64,
    backward: f64,
}

/// Builder for [`ReversibleReaction`].
///
/// Required fields: `substrate`, `product`, `forward` and `backward`.
pub struct ReversibleReactionBuilder {
    name: String,
    substrate: Option<QuantityId>,
    product: Option<QuantityId>,
    forward: Option<f64>,
    backward: Option<f64>,
    negligence_cutoff: f64,
}

impl ReversibleReaction {
    /// Create a new builder.
    pub fn builder() -> ReversibleReactionBuilder {
        ReversibleReactionBuilder {
            name: "ReversibleReaction".to_string(),
            substrate: None,
            product: None,
            forward: None,
            backward: None,
            negligence_cutoff: DEFAULT_NEGLIGENCE_CUTOFF,
        }
    }

    /// Forward rate constant `kf`.
    pub fn forward(&self) -> f64 {
        self.forward
    }

    /// Backward rate constant `kb`.
    pub fn backward(&self) -> f64 {
        self.backward
    }

    /// Substrate/product ratio at equilibrium, `kb / kf`.
    pub fn equilibrium_ratio(&self) -> f64 {
        self.backward / self.forward
    }
}

impl ReversibleReactionBuilder {
    /// Override the module name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Quantity consumed by the forward reaction.
    pub fn substrate(mut self, quantity: QuantityId) -> Self {
        self.substrate = Some(quantity);
        self
    }

    /// Quantity produced by the forward reaction.
    pub fn product(mut self, quantity: QuantityId) -> Self {
        self.product = Some(quantity);
        self
    }

    /// Forward rate constant. Must be >= 0.
    pub fn forward(mut self, rate: f64) -> Self {
        self.forward = Some(rate);
        self
    }

    /// Backward rate constant. Must be >= 0.
    pub fn backward(mut self, rate: f64) -> Self {
        self.backward = Some(rate);
        self
    }

    /// Concentrations below this magnitude report no local error
    /// (default: [`DEFAULT_NEGLIGENCE_CUTOFF`]).
    pub fn negligence_cutoff(mut self, cutoff: f64) -> Self {
        self.negligence_cutoff = cutoff;
        self
    }

    /// Build the module, validating all configuration.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a required field is missing, if substrate and
    /// product are the same quantity, or if a numeric parameter is
    /// negative or not finite.
    pub fn build(self) -> Result<ReversibleReaction, String> {
        let substrate = self
            .substrate
            .ok_or_else(|| "substrate is required".to_string())?;
        let product = self
            .product
            .ok_or_else(|| "product is required".to_string())?;
        let forward = self
            .forward
            .ok_or_else(|| "forward is required".to_string())?;
        let backward = self
            .backward
            .ok_or_else(|| "backward is required".to_string())?;
        if substrate == product {
            return Err(format!("substrate and product must differ, both are {substrate}"));
        }
        validate_rate("forward", forward)?;
        validate_rate("backward", backward)?;
        validate_cutoff(self.negligence_cutoff)?;

        Ok(ReversibleReaction {
            name: self.name,
            pair: Pair {
                substrate,
                product,
                negligence_cutoff: self.negligence_cutoff,
                local: NumericalError::MINIMAL,
            },
            forward,
            backward,
        })
    }
}

impl Module for ReversibleReaction {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_deltas(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ModuleError> {
        let (kf, kb) = (self.forward, self.backward);
        self.pair.compute(ctx, |s, p| kf * s - kb * p)
    }

    fn local_error(&self) -> LocalError {
        LocalError {
            numerical: self.pair.local,
            ..LocalError::NONE
        }
    }

    fn on_reset(&mut self) {
        self.pair.local = NumericalError::MINIMAL;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesicle_core::{EpochId, ModuleId, Updatable, UpdatableId, Updatables};
    use vesicle_module::DeltaBuffer;

    const S: QuantityId = QuantityId(0);
    const P: QuantityId = QuantityId(1);

    fn registry() -> Updatables {
        [
            Updatable::compartment(UpdatableId(0), [(S, 1.0), (P, 0.0)]),
            Updatable::compartment(UpdatableId(1), [(P, 3.0)]),
        ]
        .into_iter()
        .collect()
    }

    fn pass(
        module: &mut dyn Module,
        reg: &Updatables,
        phase: EvaluationPhase,
        h: f64,
    ) -> DeltaBuffer {
        let mut buf = DeltaBuffer::new();
        let mut ctx = StepContext::new(reg, &mut buf, ModuleId(0), phase, EpochId(0), h, 0.0, 1.0);
        module.compute_deltas(&mut ctx).unwrap();
        buf
    }

    fn first_order(k: f64) -> FirstOrderReaction {
        FirstOrderReaction::builder()
            .substrate(S)
            .product(P)
            .rate(k)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_rejects_missing_rate() {
        let result = FirstOrderReaction::builder().substrate(S).product(P).build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_rejects_same_quantity() {
        let result = FirstOrderReaction::builder()
            .substrate(S)
            .product(S)
            .rate(1.0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_rejects_negative_rate() {
        let result = ReversibleReaction::builder()
            .substrate(S)
            .product(P)
            .forward(1.0)
            .backward(-0.1)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn first_order_moves_mass() {
        let mut module = first_order(1.0);
        let reg = registry();
        let buf = pass(&mut module, &reg, EvaluationPhase::Full, 0.1);
        let totals = buf.concentration_totals();
        assert!((totals[&(UpdatableId(0), S)] + 0.1).abs() < 1e-15);
        assert!((totals[&(UpdatableId(0), P)] - 0.1).abs() < 1e-15);
        // Updatable 1 does not track the substrate.
        assert!(!totals.contains_key(&(UpdatableId(1), S)));
    }

    #[test]
    fn first_order_local_error_matches_closed_form() {
        let k = 1.0;
        let h = 0.1;
        let mut module = first_order(k);
        let reg = registry();
        pass(&mut module, &reg, EvaluationPhase::Full, h);

        // Substrate: |s(1-kh) - s(1-kh/2)^2| / s(1-kh/2)^2.
        let halves = (1.0 - k * h / 2.0_f64).powi(2);
        let expected_s = ((1.0 - k * h) - halves).abs() / halves;
        let local = module.local_error().numerical;
        assert!(local.value >= expected_s - 1e-15);
        assert_eq!(local.updatable, Some(UpdatableId(0)));
    }

    #[test]
    fn local_error_shrinks_with_step() {
        let mut module = first_order(2.0);
        let reg = registry();
        pass(&mut module, &reg, EvaluationPhase::Full, 0.2);
        let coarse = module.local_error().numerical.value;
        pass(&mut module, &reg, EvaluationPhase::Full, 0.1);
        let fine = module.local_error().numerical.value;
        assert!(fine < coarse);
    }

    #[test]
    fn half_step_pass_keeps_local_error() {
        let mut module = first_order(1.0);
        let reg = registry();
        pass(&mut module, &reg, EvaluationPhase::Full, 0.1);
        let before = module.local_error();
        pass(&mut module, &reg, EvaluationPhase::FirstHalf, 0.05);
        assert_eq!(module.local_error(), before);
    }

    #[test]
    fn second_half_reads_interim() {
        let mut module = first_order(1.0);
        let mut reg = registry();
        reg.get_mut(UpdatableId(0))
            .unwrap()
            .concentrations_mut()
            .set_interim(S, 0.5);
        let buf = pass(&mut module, &reg, EvaluationPhase::SecondHalf, 0.1);
        let totals = buf.concentration_totals();
        assert!((totals[&(UpdatableId(0), S)] + 0.05).abs() < 1e-15);
    }

    #[test]
    fn reversible_at_equilibrium_is_still() {
        let mut module = ReversibleReaction::builder()
            .substrate(S)
            .product(P)
            .forward(2.0)
            .backward(1.0)
            .build()
            .unwrap();
        let reg: Updatables = [Updatable::compartment(UpdatableId(0), [(S, 1.0), (P, 2.0)])]
            .into_iter()
            .collect();
        let buf = pass(&mut module, &reg, EvaluationPhase::Full, 0.1);
        let totals = buf.concentration_totals();
        assert_eq!(totals[&(UpdatableId(0), S)], 0.0);
        assert!(module.local_error().numerical.value == 0.0);
        assert_eq!(module.equilibrium_ratio(), 0.5);
    }

    #[test]
    fn reset_clears_local_error() {
        let mut module = first_order(1.0);
        let reg = registry();
        pass(&mut module, &reg, EvaluationPhase::Full, 0.1);
        assert!(!module.local_error().numerical.is_minimal());
        module.on_reset();
        assert!(module.local_error().numerical.is_minimal());
    }
}
