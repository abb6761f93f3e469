// src/timer.rs
use std::time::{Duration, Instant};

/// Repeating deadline driven by the caller's clock. It never fires twice for
/// one call and does not queue missed periods: a late tick pushes the next one back.
#[derive(Debug, Default)]
pub struct PeriodicTimer {
    period: Option<Duration>,
    deadline: Option<Instant>,
}

impl PeriodicTimer {
    pub fn arm(&mut self, period: Duration, now: Instant) {
        self.period = Some(period);
        self.deadline = Some(now + period);
    }

    pub fn disarm(&mut self) {
        self.period = None;
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Returns true (and schedules the next deadline) when `now` has reached the deadline.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        let (Some(period), Some(deadline)) = (self.period, self.deadline) else {
            return false;
        };
        if now < deadline {
            return false;
        }
        let next = deadline + period;
        self.deadline = Some(if next <= now { now + period } else { next });
        true
    }

    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}
