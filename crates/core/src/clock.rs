//! Time sources.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{Duration, Utc};

use crate::Time;

/// Source of timestamps for a traversal.
pub trait Clock {
    /// Current time.
    fn now(&self) -> Time;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Time {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a handle kept by a test can drive the
/// clock owned by a traversal.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Time>>,
}

impl ManualClock {
    /// Create a clock stopped at `start`.
    pub fn new(start: Time) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Move the clock forward (or back, for a negative duration).
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Jump to a specific time.
    pub fn set(&self, at: Time) {
        self.now.set(at);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Time::default())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Time {
        self.now.get()
    }
}
