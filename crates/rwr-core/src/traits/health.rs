//! Server health metric (ticks per second on a 0-20 scale).

/// Value reported when the host cannot provide a reading.
pub const NOMINAL_HEALTH: f64 = 20.0;

/// Optional health reading. Used only for run reports.
pub trait HealthSource: Send + Sync {
    /// Current reading, or `None` if unavailable.
    fn sample(&self) -> Option<f64>;

    /// Current reading, falling back to [`NOMINAL_HEALTH`].
    fn sample_or_nominal(&self) -> f64 {
        match self.sample() {
            Some(v) => v,
            None => {
                tracing::warn!("⚠️ Health metric unavailable, using {NOMINAL_HEALTH:.1}");
                NOMINAL_HEALTH
            }
        }
    }
}

/// A host without a health metric.
pub struct NoHealth;

impl HealthSource for NoHealth {
    fn sample(&self) -> Option<f64> {
        None
    }
}
