//! Round countdown for Quizwire rooms.
//!
//! A [`RoundClock`] tracks at most one pending deadline: either an open
//! round's countdown or the pause between two rounds. It is owned by the
//! room actor and polled from the actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         event = clock.next_event() => {
//!             match event {
//!                 ClockEvent::Remaining { generation, seconds } => { /* timer_update */ }
//!                 ClockEvent::Expired { generation } => { /* end round */ }
//!                 ClockEvent::IntermissionOver { generation } => { /* next round */ }
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! Every event carries the generation it was started with. The room
//! compares it against its own round generation and drops stale events,
//! so a countdown that was replaced can never end the wrong round.
//!
//! When idle, [`RoundClock::next_event`] pends forever and `select!` simply
//! keeps serving the other branches.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// What the clock has to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// Whole seconds left in the countdown changed.
    Remaining { generation: u64, seconds: u64 },
    /// The countdown reached its deadline. The clock is idle afterwards.
    Expired { generation: u64 },
    /// The pause between rounds is over. The clock is idle afterwards.
    IntermissionOver { generation: u64 },
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Idle,
    Countdown {
        generation: u64,
        deadline: Instant,
        next_tick: Instant,
        last_reported: u64,
    },
    Intermission {
        generation: u64,
        until: Instant,
    },
}

/// Deadline-based countdown with a fixed reporting cadence.
#[derive(Debug)]
pub struct RoundClock {
    tick: Duration,
    phase: Phase,
}

impl Default for RoundClock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TICK)
    }
}

impl RoundClock {
    /// How often remaining time is re-checked.
    pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

    /// Creates an idle clock. A zero tick is bumped to one millisecond.
    pub fn new(tick: Duration) -> Self {
        let tick = if tick.is_zero() {
            warn!("round clock tick of zero requested, using 1ms");
            Duration::from_millis(1)
        } else {
            tick
        };
        Self {
            tick,
            phase: Phase::Idle,
        }
    }

    /// Starts a countdown of `duration` tagged with `generation`, replacing
    /// whatever was pending. Returns the initial whole seconds remaining so
    /// the caller can announce it right away.
    pub fn start_countdown(&mut self, generation: u64, duration: Duration) -> u64 {
        let now = Instant::now();
        let seconds = ceil_secs(duration);
        self.phase = Phase::Countdown {
            generation,
            deadline: now + duration,
            next_tick: now + self.tick,
            last_reported: seconds,
        };
        debug!(generation, seconds, "countdown started");
        seconds
    }

    /// Schedules the end of the pause between rounds, replacing whatever
    /// was pending.
    pub fn start_intermission(&mut self, generation: u64, duration: Duration) {
        self.phase = Phase::Intermission {
            generation,
            until: Instant::now() + duration,
        };
        debug!(generation, pause_ms = duration.as_millis() as u64, "intermission started");
    }

    /// Drops any pending countdown or intermission.
    pub fn cancel(&mut self) {
        if !matches!(self.phase, Phase::Idle) {
            trace!("round clock cancelled");
        }
        self.phase = Phase::Idle;
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    /// Returns `true` while a pause between rounds is pending.
    pub fn in_intermission(&self) -> bool {
        matches!(self.phase, Phase::Intermission { .. })
    }

    /// Whole seconds left in the running countdown, rounded up.
    pub fn remaining_secs(&self) -> Option<u64> {
        match self.phase {
            Phase::Countdown { deadline, .. } => {
                Some(ceil_secs(deadline.saturating_duration_since(Instant::now())))
            }
            _ => None,
        }
    }

    /// Waits for the next thing worth reporting.
    ///
    /// Cancel-safe: the only await point is a sleep, and the clock's state
    /// changes only after it completes.
    pub async fn next_event(&mut self) -> ClockEvent {
        loop {
            let wake = match self.phase {
                Phase::Idle => std::future::pending::<Instant>().await,
                Phase::Countdown {
                    deadline, next_tick, ..
                } => next_tick.min(deadline),
                Phase::Intermission { until, .. } => until,
            };

            time::sleep_until(wake).await;
            let now = Instant::now();

            match self.phase {
                Phase::Idle => continue,
                Phase::Intermission { generation, until } => {
                    if now < until {
                        continue;
                    }
                    self.phase = Phase::Idle;
                    return ClockEvent::IntermissionOver { generation };
                }
                Phase::Countdown {
                    generation,
                    deadline,
                    next_tick,
                    last_reported,
                } => {
                    if now >= deadline {
                        self.phase = Phase::Idle;
                        trace!(generation, "countdown expired");
                        return ClockEvent::Expired { generation };
                    }

                    let late_by = now.saturating_duration_since(next_tick);
                    if late_by > self.tick / 10 {
                        warn!(
                            generation,
                            late_ms = late_by.as_secs_f64() * 1000.0,
                            "countdown tick late, skipping ahead"
                        );
                    }

                    let seconds = ceil_secs(deadline - now);
                    self.phase = Phase::Countdown {
                        generation,
                        deadline,
                        next_tick: now + self.tick,
                        last_reported: seconds,
                    };
                    if seconds != last_reported {
                        return ClockEvent::Remaining {
                            generation,
                            seconds,
                        };
                    }
                }
            }
        }
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceil_secs_rounds_up() {
        assert_eq!(ceil_secs(Duration::ZERO), 0);
        assert_eq!(ceil_secs(Duration::from_millis(1)), 1);
        assert_eq!(ceil_secs(Duration::from_millis(2500)), 3);
        assert_eq!(ceil_secs(Duration::from_secs(30)), 30);
    }

    #[test]
    fn test_new_clock_is_idle() {
        let clock = RoundClock::default();
        assert!(clock.is_idle());
        assert_eq!(clock.remaining_secs(), None);
    }

    #[test]
    fn test_zero_tick_is_bumped() {
        let clock = RoundClock::new(Duration::ZERO);
        assert_eq!(clock.tick, Duration::from_millis(1));
    }
}
