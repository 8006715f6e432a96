//! Per-epoch metrics for the scheduler.
//!
//! [`EpochMetrics`] captures timing, retry and error data for a single
//! committed epoch, for telemetry and for tuning tolerances.

/// Timing and error metrics collected during a single epoch.
///
/// All durations are in microseconds and cover every attempt of the
/// epoch, including the ones that were discarded.
#[derive(Clone, Debug, Default)]
pub struct EpochMetrics {
    /// Wall-clock time for the entire epoch, in microseconds.
    pub total_us: u64,
    /// Per-module execution times summed over all passes:
    /// `(name, microseconds)`.
    pub module_us: Vec<(String, u64)>,
    /// Number of times the epoch restarted from a cleared state.
    pub attempts: u32,
    /// Step decreases requested by local checks.
    pub local_decreases: u32,
    /// Step decreases requested by global checks.
    pub global_decreases: u32,
    /// Whether the half-step passes were skipped because the full step
    /// produced no concentration change.
    pub step_doubling_skipped: bool,
    /// Largest local numerical error of the committed attempt.
    pub local_numerical_error: f64,
    /// Global numerical error of the committed attempt.
    pub global_numerical_error: f64,
    /// Global displacement deviation of the committed attempt.
    pub global_displacement_deviation: f64,
    /// Number of moves rejected by the spatial layer.
    pub collisions: usize,
}

impl EpochMetrics {
    /// Add `us` microseconds to the named module's running total.
    pub(crate) fn record_module(&mut self, name: &str, us: u64) {
        match self.module_us.iter_mut().find(|(n, _)| n == name) {
            Some((_, total)) => *total += us,
            None => self.module_us.push((name.to_string(), us)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = EpochMetrics::default();
        assert_eq!(m.total_us, 0);
        assert!(m.module_us.is_empty());
        assert_eq!(m.attempts, 0);
        assert_eq!(m.local_decreases, 0);
        assert_eq!(m.global_decreases, 0);
        assert!(!m.step_doubling_skipped);
        assert_eq!(m.collisions, 0);
    }

    #[test]
    fn module_time_accumulates_by_name() {
        let mut m = EpochMetrics::default();
        m.record_module("decay", 5);
        m.record_module("drift", 2);
        m.record_module("decay", 7);
        assert_eq!(
            m.module_us,
            vec![("decay".to_string(), 12), ("drift".to_string(), 2)]
        );
    }
}
