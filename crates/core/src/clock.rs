// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling
//!
//! Two readings are exposed: a monotonic `Instant` used for debounce and
//! return windows, and wall-clock epoch seconds used for session stamps and
//! history records.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Wall-clock time in seconds since the Unix epoch
    fn timestamp(&self) -> f64;
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn timestamp(&self) -> f64 {
        let now = chrono::Utc::now();
        now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
    }
}

#[derive(Debug)]
struct FakeTime {
    instant: Instant,
    epoch_secs: f64,
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<FakeTime>>,
}

impl FakeClock {
    /// Epoch seconds a fresh fake clock reports (2026-01-01T00:00:00Z)
    pub const START_EPOCH_SECS: f64 = 1_767_225_600.0;

    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(FakeTime {
                instant: Instant::now(),
                epoch_secs: Self::START_EPOCH_SECS,
            })),
        }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.instant += duration;
        current.epoch_secs += duration.as_secs_f64();
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .instant
    }

    fn timestamp(&self) -> f64 {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .epoch_secs
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
