//! Periodic triggers driven by the main loop's clock.

use std::time::{Duration, Instant};

/// A stoppable repeating deadline. The loop asks `fire(now)` and gets at most one firing per call.
#[derive(Debug, Clone)]
pub struct Trigger {
    interval: Duration,
    next_due: Option<Instant>,
}

impl Trigger {
    /// Stopped trigger with the given period.
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    /// Safe to call on a stopped trigger.
    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub const fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the period. A running trigger restarts its countdown from `now`.
    pub fn set_interval(&mut self, interval: Duration, now: Instant) {
        self.interval = interval;
        if self.is_running() {
            self.start(now);
        }
    }

    /// True once per elapsed period. A late poll schedules the next firing from `now`
    /// so a stalled loop does not replay a burst of missed periods.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                let next = due + self.interval;
                self.next_due = Some(if next > now { next } else { now + self.interval });
                true
            }
            _ => false,
        }
    }

    /// Time left until the next firing; `None` when stopped.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}
