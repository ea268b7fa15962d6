#![forbid(unsafe_code)]

//! Cancel-and-reschedule debouncing driven by explicit instants.
//!
//! Used for window-resize handling: every trigger pushes the deadline out,
//! and the work runs once when [`Debouncer::poll`] is called at or after
//! the deadline. Time is passed in by the caller, so tests need no clock.

use std::time::Duration;

use web_time::Instant;

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
    fired: u64,
}

impl Debouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            fired: 0,
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule (or reschedule) the pending run for `now + delay`.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Returns `true` exactly once per settled burst of triggers.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.fired += 1;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Completed runs.
    #[must_use]
    pub fn fired(&self) -> u64 {
        self.fired
    }
}
