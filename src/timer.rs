use std::time::{Duration, Instant};

/// Period of the session clock.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Recurring deadline that fires once per interval.
///
/// The event loop waits until [`SecondTimer::deadline`] and then reports a
/// tick; [`SecondTimer::advance`] schedules the next one relative to the
/// previous deadline so the cadence does not drift with processing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondTimer {
    interval: Duration,
    deadline: Instant,
}

impl SecondTimer {
    pub fn with_interval(now: Instant, interval: Duration) -> Self {
        Self {
            interval,
            deadline: now + interval,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    pub fn advance(&mut self) {
        self.deadline += self.interval;
    }
}
