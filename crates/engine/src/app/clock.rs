use std::time::Duration;

use tracing::warn;

use crate::config::CoreConfig;

/// Whole ticks owed for an accumulated duration, capped per advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DueTicks {
    count: u32,
    /// Partial tick carried into the next advance.
    carry: Duration,
    /// Backlog thrown away once the cap is hit.
    skipped: Duration,
}

impl DueTicks {
    fn split(accumulated: Duration, fixed_dt: Duration, cap: u32) -> Self {
        if fixed_dt.is_zero() {
            return Self {
                count: 0,
                carry: Duration::ZERO,
                skipped: accumulated,
            };
        }
        let owed = accumulated.as_nanos() / fixed_dt.as_nanos();
        let count = u32::try_from(owed).unwrap_or(u32::MAX).min(cap);
        let rest = accumulated.saturating_sub(fixed_dt.saturating_mul(count));
        if rest >= fixed_dt {
            Self {
                count,
                carry: Duration::ZERO,
                skipped: rest,
            }
        } else {
            Self {
                count,
                carry: rest,
                skipped: Duration::ZERO,
            }
        }
    }
}

/// Fixed-step accumulator turning wall-clock deltas into whole ticks.
#[derive(Debug, Clone)]
pub struct TickClock {
    fixed_dt: Duration,
    max_frame_delta: Duration,
    max_ticks: u32,
    accumulator: Duration,
    tick: u64,
}

impl TickClock {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            fixed_dt: config.fixed_dt(),
            max_frame_delta: config.max_frame_delta(),
            max_ticks: config.max_ticks_per_advance.max(1),
            accumulator: Duration::ZERO,
            tick: 0,
        }
    }

    pub fn fixed_dt(&self) -> Duration {
        self.fixed_dt
    }

    /// Monotonic count of ticks run so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Adds `elapsed` and returns how many ticks are due now.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        let clamped = elapsed.min(self.max_frame_delta);
        let accumulator = self.accumulator.saturating_add(clamped);
        let due = DueTicks::split(accumulator, self.fixed_dt, self.max_ticks);
        if !due.skipped.is_zero() {
            warn!(
                skipped_ms = due.skipped.as_millis() as u64,
                max_ticks = self.max_ticks,
                "tick_backlog_skipped"
            );
        }
        self.accumulator = due.carry;
        self.tick = self.tick.saturating_add(u64::from(due.count));
        due.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_ticks_keep_the_partial_tick() {
        let due = DueTicks::split(Duration::from_millis(110), Duration::from_millis(33), 5);
        assert_eq!(
            due,
            DueTicks {
                count: 3,
                carry: Duration::from_millis(11),
                skipped: Duration::ZERO,
            }
        );
    }

    #[test]
    fn due_ticks_skip_the_backlog_past_the_cap() {
        let due = DueTicks::split(Duration::from_millis(200), Duration::from_millis(33), 3);
        assert_eq!(due.count, 3);
        assert_eq!(due.carry, Duration::ZERO);
        assert_eq!(due.skipped, Duration::from_millis(101));
    }

    #[test]
    fn zero_tick_length_runs_nothing() {
        let due = DueTicks::split(Duration::from_millis(50), Duration::ZERO, 3);
        assert_eq!(due.count, 0);
        assert_eq!(due.skipped, Duration::from_millis(50));
    }

    #[test]
    fn clock_carries_remainder_between_calls() {
        let mut clock = TickClock::new(&CoreConfig::default());
        assert_eq!(clock.advance(Duration::from_millis(20)), 0);
        assert_eq!(clock.advance(Duration::from_millis(20)), 1);
        assert_eq!(clock.advance(Duration::from_millis(26)), 1);
        assert_eq!(clock.tick(), 2);
    }

    #[test]
    fn huge_frame_is_clamped_before_planning() {
        let mut clock = TickClock::new(&CoreConfig::default());
        assert_eq!(clock.advance(Duration::from_secs(10)), 5);
        assert_eq!(clock.advance(Duration::ZERO), 0);
    }
}
