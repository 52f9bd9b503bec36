//! Single-slot scheduled task with an injectable clock.
//!
//! The playback loop needs exactly one pending timer at a time: any state
//! change replaces it, teardown drops it. Instead of re-registering
//! callbacks, the pending task is a plain value polled from the update loop:
//!
//! ```ignore
//! slot.schedule(index, clock.now() + frame_duration); // replaces any previous task
//! // In update loop:
//! while let Some(fired) = slot.poll(clock.now()) {
//!     advance(fired.payload, fired.due);
//! }
//! ```
//!
//! Nothing fires unless `poll` is called, so a cancelled task can never run
//! against state it no longer matches.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of monotonic time for schedulers.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-driven clock for tests and headless stepping.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        })
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner()) += by;
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }
}

/// Task that became due during `poll`.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<T> {
    pub payload: T,
    /// Time the task was due (not the time it was polled).
    pub due: Instant,
    pub token: u64,
}

#[derive(Debug, Clone)]
struct Pending<T> {
    payload: T,
    due: Instant,
    token: u64,
}

/// At most one pending task. Scheduling replaces, dropping cancels.
#[derive(Debug, Clone)]
pub struct TaskSlot<T> {
    pending: Option<Pending<T>>,
    next_token: u64,
}

impl<T> Default for TaskSlot<T> {
    fn default() -> Self {
        Self {
            pending: None,
            next_token: 1,
        }
    }
}

impl<T> TaskSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `payload` at `due`, cancelling whatever was pending.
    /// Returns the token of the new task.
    pub fn schedule(&mut self, payload: T, due: Instant) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        if let Some(old) = self.pending.replace(Pending { payload, due, token }) {
            log::trace!("TaskSlot: task {} replaced by {}", old.token, token);
        }
        token
    }

    /// Cancel the pending task. Returns true if something was cancelled.
    pub fn cancel(&mut self) -> bool {
        let cancelled = self.pending.take();
        if let Some(ref task) = cancelled {
            log::trace!("TaskSlot: task {} cancelled", task.token);
        }
        cancelled.is_some()
    }

    /// Take the pending task if it is due at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<Fired<T>> {
        let due = self.pending.as_ref()?.due;
        if now < due {
            return None;
        }
        self.pending.take().map(|p| Fired {
            payload: p.payload,
            due: p.due,
            token: p.token,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Deadline of the pending task.
    pub fn due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    pub fn payload(&self) -> Option<&T> {
        self.pending.as_ref().map(|p| &p.payload)
    }

    /// Time left until the pending task is due (zero if overdue).
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.due().map(|due| due.saturating_duration_since(now))
    }
}
