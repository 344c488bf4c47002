//! Wall-clock fixed-timestep game-tick source.

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

use crate::TICKS_PER_SECOND;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a game tick fires late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Forget the missed ticks and schedule the next one from now.
    /// Round timers run slow under load but never burst.
    #[default]
    Skip,
    /// Fire missed ticks back to back, up to `max_catchup` of them, so
    /// round timers keep wall-clock pace after a short stall.
    CatchUp { max_catchup: u32 },
}

/// Configuration for the [`TickScheduler`].
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Game ticks per second. Must be at least 1.
    pub tick_rate_hz: u32,
    /// Overrun handling policy.
    pub policy: TickPolicy,
    /// Fraction of the tick budget (0.0–1.0) above which a tick logs a
    /// warning. Default 0.8.
    pub budget_warn_threshold: f64,
    /// Random delay (0–max µs) added before the first tick.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: TICKS_PER_SECOND,
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.8,
            initial_jitter_us: 0,
        }
    }
}

impl TickConfig {
    /// Highest supported rate.
    pub const MAX_TICK_RATE_HZ: u32 = 100;

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values. Called by [`TickScheduler::new`].
    pub fn validated(mut self) -> Self {
        if self.tick_rate_hz == 0 {
            warn!("tick_rate_hz of 0 is not allowed, using 1");
            self.tick_rate_hz = 1;
        }
        if self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                max = Self::MAX_TICK_RATE_HZ,
                "tick_rate_hz exceeds maximum, clamping"
            );
            self.tick_rate_hz = Self::MAX_TICK_RATE_HZ;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }

    /// Duration of a single game tick.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}

// ---------------------------------------------------------------------------
// TickInfo
// ---------------------------------------------------------------------------

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// `true` if the tick fired more than 10% of a tick late.
    pub overrun: bool,
    /// Ticks dropped because of the overrun policy.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Produces game ticks at a fixed wall-clock rate.
pub struct TickScheduler {
    config: TickConfig,
    tick_duration: Duration,
    tick_count: u64,
    next_tick: TokioInstant,
    tick_start: Option<Instant>,
    paused: bool,
    total_overruns: u64,
    last_tick_time: Duration,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();
        let jitter = if config.initial_jitter_us > 0 {
            Duration::from_micros(rand::rng().random_range(0..config.initial_jitter_us))
        } else {
            Duration::ZERO
        };

        debug!(
            rate_hz = config.tick_rate_hz,
            policy = ?config.policy,
            "tick scheduler created"
        );

        Self {
            tick_duration,
            tick_count: 0,
            next_tick: TokioInstant::now() + tick_duration + jitter,
            tick_start: None,
            paused: false,
            total_overruns: 0,
            last_tick_time: Duration::ZERO,
            config,
        }
    }

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Waits for the next game tick.
    ///
    /// While paused this future never resolves, so it can sit in a
    /// `tokio::select!` next to a shutdown branch.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        if self.paused {
            std::future::pending::<()>().await;
        }

        let due = self.next_tick;
        time::sleep_until(due).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > self.tick_duration / 10;
        let behind = (late_by.as_nanos() / self.tick_duration.as_nanos()) as u64;
        let mut ticks_skipped = 0;

        self.next_tick = match self.config.policy {
            TickPolicy::Skip => {
                ticks_skipped = if overrun { behind } else { 0 };
                if ticks_skipped > 0 {
                    warn!(
                        tick = self.tick_count,
                        skipped = ticks_skipped,
                        "game tick overrun, skipping ahead"
                    );
                }
                now + self.tick_duration
            }
            TickPolicy::CatchUp { max_catchup } => {
                if overrun && behind > u64::from(max_catchup) {
                    ticks_skipped = behind - u64::from(max_catchup);
                    warn!(
                        tick = self.tick_count,
                        behind,
                        skipped = ticks_skipped,
                        "game tick overrun beyond catch-up cap"
                    );
                    now + self.tick_duration
                } else {
                    due + self.tick_duration
                }
            }
        };

        if overrun {
            self.total_overruns += 1;
        }
        trace!(tick = self.tick_count, overrun, "game tick");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Marks the end of the work done for the current tick and warns if
    /// it used too much of the tick budget.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        self.last_tick_time = elapsed;
        let utilization = elapsed.as_secs_f64() / self.tick_duration.as_secs_f64();
        if utilization >= 1.0 {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                "game tick exceeded its budget"
            );
        } else if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                utilization_pct = %format!("{:.1}", utilization * 100.0),
                "game tick approaching budget"
            );
        }
    }

    /// Stops ticks until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Resumes ticking one tick from now, without replaying the pause.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_tick = TokioInstant::now() + self.tick_duration;
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn total_overruns(&self) -> u64 {
        self.total_overruns
    }

    /// Work time of the most recently recorded tick.
    pub fn last_tick_time(&self) -> Duration {
        self.last_tick_time
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}
