use std::time::Duration;

/// Paces reconnection attempts to at most one per interval.
///
/// Times are clock readings from [`Clock::now`](crate::time::Clock::now).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTimer {
    deadline: Duration,
    interval: Duration,
}

impl RetryTimer {
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            deadline: Duration::ZERO,
            interval,
        }
    }

    /// Make the next attempt due immediately.
    pub fn arm_now(&mut self, now: Duration) {
        self.deadline = now;
    }

    /// Whether an attempt may be made at `now`.
    #[must_use]
    pub fn is_due(&self, now: Duration) -> bool {
        now >= self.deadline
    }

    /// Record an attempt at `now`; the next one is due one interval later.
    pub fn rearm(&mut self, now: Duration) {
        self.deadline = now + self.interval;
    }

    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}
