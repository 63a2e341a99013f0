use std::time::Duration;

use tracing::warn;

/// What the scheduler does when it wakes up late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Forget the missed ticks and schedule the next one from now.
    #[default]
    Skip,
    /// Keep the original cadence; the next tick fires on its old deadline.
    Drop,
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Ticks per second. 0 disables ticking entirely.
    pub tick_rate_hz: u32,
    pub policy: TickPolicy,
    /// Fraction of the tick budget (0.0..=1.0) above which a tick logs a
    /// warning.
    pub budget_warn_threshold: f64,
    /// Upper bound of the random delay added to the first tick only.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: Self::DEFAULT_TICK_RATE_HZ,
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
            initial_jitter_us: 2_000,
        }
    }
}

impl TickConfig {
    /// The host game loop's native cadence.
    pub const DEFAULT_TICK_RATE_HZ: u32 = 20;
    pub const MAX_TICK_RATE_HZ: u32 = 100;

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values. [`TickScheduler::new`](crate::TickScheduler::new)
    /// calls this for you.
    pub fn validated(mut self) -> Self {
        if self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                max = Self::MAX_TICK_RATE_HZ,
                "tick rate too high, clamping"
            );
            self.tick_rate_hz = Self::MAX_TICK_RATE_HZ;
        }
        if !self.budget_warn_threshold.is_finite() {
            self.budget_warn_threshold = 0.80;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }

    /// Length of one tick, `None` when ticking is disabled.
    pub fn tick_duration(&self) -> Option<Duration> {
        (self.tick_rate_hz > 0).then(|| Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64))
    }

    /// How many ticks make up `duration`, rounded up. Zero when ticking is
    /// disabled.
    pub fn ticks_for(&self, duration: Duration) -> u64 {
        match self.tick_duration() {
            Some(tick) => duration.as_nanos().div_ceil(tick.as_nanos()) as u64,
            None => 0,
        }
    }
}
