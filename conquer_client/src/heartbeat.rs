// Queue heartbeat timer.
//
// A cancellable one-shot deadline that the matchmaking channel re-arms
// after every successful queue reply, which makes it a repeating task for
// as long as the server keeps answering. The state machine cancels it on
// every exit from Queue mode, so no heartbeat can leak into a game.
//
// There is no background timer thread: `poll_due(now)` is checked from the
// core's pump with the caller's clock.

use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct Heartbeat {
    period: Duration,
    next_due: Option<Instant>,
}

impl Heartbeat {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_due: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Arm the timer to fire one period after `now`. Re-arming replaces any
    /// earlier deadline.
    pub fn schedule(&mut self, now: Instant) {
        self.next_due = Some(now + self.period);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_scheduled(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn due_at(&self) -> Option<Instant> {
        self.next_due
    }

    /// True exactly once when the deadline has passed; disarms the timer.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = None;
                true
            }
            _ => false,
        }
    }
}
