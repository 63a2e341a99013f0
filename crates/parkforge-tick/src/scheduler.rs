//! The fixed-cadence tick loop.
//!
//! A [`TickScheduler`] hands out ticks at `tick_rate_hz`, tracks how late
//! each wake-up was, and measures how much of the tick budget the engine
//! used. It does no work itself: the runtime awaits
//! [`wait_for_tick`](TickScheduler::wait_for_tick) and runs the engine.

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

use crate::{TickConfig, TickPolicy};

/// One fired tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickInfo {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Fixed length of a tick.
    pub dt: Duration,
    /// Woke up more than 10% past the deadline.
    pub overrun: bool,
    /// Whole ticks lost to the overrun (Skip policy only).
    pub ticks_skipped: u64,
}

impl TickInfo {
    /// True on every `n`th tick. `n == 0` never matches.
    ///
    /// The live timer uses this to run once per second at 20 Hz.
    pub fn every(&self, n: u64) -> bool {
        n != 0 && self.tick % n == 0
    }
}

/// Counters kept across the scheduler's lifetime.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Longest engine work reported through `record_tick_end`.
    pub max_tick_time: Duration,
    /// Last tick's work divided by the tick budget.
    pub budget_utilization: f64,
}

/// Fixed-cadence scheduler driving one engine.
#[derive(Debug)]
pub struct TickScheduler {
    config: TickConfig,
    tick_duration: Option<Duration>,
    tick_count: u64,
    next_tick: Option<TokioInstant>,
    /// Wall-clock start of the current tick's work.
    work_started: Option<Instant>,
    paused: bool,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Builds a scheduler. The first tick gets a random jitter of up to
    /// `initial_jitter_us`.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();

        let next_tick = tick_duration.map(|d| {
            let jitter = match config.initial_jitter_us {
                0 => Duration::ZERO,
                max => Duration::from_micros(rand::rng().random_range(0..max)),
            };
            TokioInstant::now() + d + jitter
        });

        match tick_duration {
            Some(d) => debug!(
                rate_hz = config.tick_rate_hz,
                budget_ms = d.as_secs_f64() * 1000.0,
                policy = ?config.policy,
                "tick scheduler created"
            ),
            None => debug!("tick scheduler created with ticking disabled"),
        }

        Self {
            config,
            tick_duration,
            tick_count: 0,
            next_tick,
            work_started: None,
            paused: false,
            metrics: TickMetrics::default(),
        }
    }

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Resolves when the next tick is due and returns what happened on it.
    ///
    /// Pends forever while paused or when ticking is disabled, so it can
    /// sit in a `select!` next to a command channel: the other branches keep
    /// running and the pending sleep is simply dropped.
    ///
    /// Waking more than a tenth of a tick past the deadline is an overrun.
    /// What the next deadline becomes then depends on [`TickPolicy`]:
    ///
    /// - `Skip`: the next tick is one full tick from now. Missed ticks are
    ///   counted in [`TickInfo::ticks_skipped`] and never replayed, so a
    ///   long stall can't make the live timer fire several times in a row.
    /// - `Drop`: the original cadence is kept and only the late tick is
    ///   shortened.
    ///
    /// Call [`record_tick_end`](Self::record_tick_end) once the engine has
    /// processed the tick.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let (deadline, dt) = match (self.next_tick, self.tick_duration) {
            (Some(deadline), Some(dt)) if !self.paused => (deadline, dt),
            _ => std::future::pending().await,
        };
        time::sleep_until(deadline).await;

        let woke = TokioInstant::now();
        self.tick_count += 1;
        self.work_started = Some(Instant::now());

        let late_by = woke.saturating_duration_since(deadline);
        let overrun = late_by > dt / 10;
        let ticks_skipped = if overrun { self.on_overrun(late_by, dt) } else { 0 };
        self.next_tick = Some(match self.config.policy {
            TickPolicy::Skip => woke + dt,
            TickPolicy::Drop => deadline + dt,
        });

        self.metrics.total_ticks += 1;
        self.metrics.total_skipped += ticks_skipped;
        self.metrics.total_overruns += u64::from(overrun);
        trace!(tick = self.tick_count, overrun, "tick");

        TickInfo {
            tick: self.tick_count,
            dt,
            overrun,
            ticks_skipped,
        }
    }

    /// Logs a late wake-up. Returns how many whole ticks were lost, which
    /// is always zero under `Drop`.
    fn on_overrun(&self, late_by: Duration, dt: Duration) -> u64 {
        let late_ms = late_by.as_secs_f64() * 1000.0;
        match self.config.policy {
            TickPolicy::Skip => {
                let lost = (late_by.as_nanos() / dt.as_nanos()) as u64;
                if lost > 0 {
                    warn!(tick = self.tick_count, skipped = lost, late_ms, "tick overrun, skipping ahead");
                }
                lost
            }
            TickPolicy::Drop => {
                warn!(tick = self.tick_count, late_ms, "tick overrun, keeping cadence");
                0
            }
        }
    }

    /// Marks the end of the current tick's work and checks it against the
    /// budget. A no-op if no tick is in progress.
    pub fn record_tick_end(&mut self) {
        let Some(started) = self.work_started.take() else {
            return;
        };
        let elapsed = started.elapsed();
        self.metrics.max_tick_time = self.metrics.max_tick_time.max(elapsed);

        let Some(budget) = self.tick_duration else {
            return;
        };
        let utilization = elapsed.as_secs_f64() / budget.as_secs_f64();
        self.metrics.budget_utilization = utilization;

        if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = budget.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "tick work near or over budget"
            );
        }
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Resumes ticking one full tick from now, so time spent paused does
    /// not count as an overrun.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_tick = self.tick_duration.map(|d| TokioInstant::now() + d);
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_disabled(&self) -> bool {
        self.tick_duration.is_none()
    }

    /// Last fired tick (0 before the first).
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    pub fn tick_duration(&self) -> Option<Duration> {
        self.tick_duration
    }
}
