// SPDX-License-Identifier: MIT OR Apache-2.0
//! Time sources for activation timestamps and pin records.
//!
//! Time is only used for telemetry; no control flow depends on it.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Process-wide time oracle
pub trait TimeSource {
    /// Current time in seconds
    fn current_time(&self) -> f64;
}

/// Monotonic seconds since the clock was created
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Create a clock starting at zero
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemClock {
    fn current_time(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same time, so a caller can keep a handle after handing
/// the clock to a graph.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    /// Create a clock at `start` seconds
    pub fn new(start: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Jump to a time
    pub fn set(&self, time: f64) {
        self.now.set(time);
    }

    /// Move forward by `seconds`
    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }
}

impl TimeSource for ManualClock {
    fn current_time(&self) -> f64 {
        self.now.get()
    }
}
