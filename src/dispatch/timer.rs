//! The shared flush deadline.
//!
//! One `FlushTimer` is shared between the dispatch loop and every publish
//! task. The loop consumes the deadline when it fires; a publish task rearms
//! it once its publish attempt completes. Until then the timer holds no
//! deadline, so the time-based path never has two flushes outstanding.
//!
//! Two publish tasks finishing together may both rearm. The later write
//! wins. That only shifts the next time-based flush, it never loses or
//! duplicates a batch.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Debug)]
pub struct FlushTimer {
    period: Duration,
    deadline: Mutex<Option<Instant>>,
    rearmed: Notify,
}

impl FlushTimer {
    /// A timer armed to fire one `period` from now.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            deadline: Mutex::new(Some(Instant::now() + period)),
            rearmed: Notify::new(),
        }
    }

    /// Arm the timer one period from now, replacing any pending deadline.
    pub fn reset(&self) {
        *self.slot() = Some(Instant::now() + self.period);
        self.rearmed.notify_one();
    }

    /// Pending deadline, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        *self.slot()
    }

    pub fn is_armed(&self) -> bool {
        self.deadline().is_some()
    }

    /// Consume the deadline if it has passed. Returns whether it fired.
    ///
    /// A deadline pushed into the future by a concurrent `reset` is left
    /// alone.
    pub fn fire_if_due(&self, now: Instant) -> bool {
        let mut slot = self.slot();
        match *slot {
            Some(deadline) if deadline <= now => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// Resolves after the next `reset`.
    pub fn rearmed(&self) -> Notified<'_> {
        self.rearmed.notified()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Instant>> {
        self.deadline.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
