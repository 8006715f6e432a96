//! Displacement functions for [`DisplacementModule`] rules.
//!
//! Each function returns a closure suitable for
//! [`DisplacementModuleBuilder::rule`] or
//! [`DisplacementModuleBuilder::always`].
//!
//! [`DisplacementModule`]: vesicle_module::DisplacementModule
//! [`DisplacementModuleBuilder::rule`]: vesicle_module::DisplacementModuleBuilder::rule
//! [`DisplacementModuleBuilder::always`]: vesicle_module::DisplacementModuleBuilder::always

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use vesicle_core::Updatable;
use vesicle_module::StepContext;

/// Constant-velocity drift: `v · h`.
pub fn drift(
    velocity: DVec2,
) -> impl Fn(&Updatable, &StepContext<'_>) -> DVec2 + Send + 'static {
    move |_, ctx| velocity * ctx.step()
}

/// Brownian motion with diffusion coefficient `diffusivity`.
///
/// Each axis is drawn from `N(0, 2·D·h)`. The RNG is a ChaCha8 stream
/// seeded from `seed XOR epoch XOR (updatable << 32)`, so a retried epoch
/// draws the same directions at the shrunk step, and replays with the same
/// seed are identical.
pub fn brownian(
    diffusivity: f64,
    seed: u64,
) -> impl Fn(&Updatable, &StepContext<'_>) -> DVec2 + Send + 'static {
    move |u, ctx| {
        let sigma = (2.0 * diffusivity * ctx.step()).sqrt();
        let stream = seed ^ ctx.epoch().0 ^ (u64::from(u.id().0) << 32);
        let mut rng = ChaCha8Rng::seed_from_u64(stream);
        box_muller(&mut rng) * sigma
    }
}

/// Two independent standard normal samples.
fn box_muller(rng: &mut ChaCha8Rng) -> DVec2 {
    let u1: f64 = rng.random::<f64>().max(1e-300); // avoid ln(0)
    let u2: f64 = rng.random();
    let r = (-2.0 * u1.ln()).sqrt();
    let theta = 2.0 * std::f64::consts::PI * u2;
    DVec2::new(r * theta.cos(), r * theta.sin())
}
