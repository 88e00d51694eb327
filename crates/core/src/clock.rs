// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable uptime handling.
//!
//! Mirrors `android.os.SystemClock`: a single process-wide monotonic
//! uptime used by [`crate::message_queue::MessageQueue`] to decide when a
//! delayed [`crate::message::Message`] becomes due.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of monotonic uptime.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Milliseconds since an arbitrary but fixed epoch, strictly
    /// non-decreasing for a given clock instance.
    fn uptime_millis(&self) -> u64;

    /// The same instant as an [`Instant`], for use with
    /// [`parking_lot::Condvar::wait_for`] and friends.
    fn now(&self) -> Instant;
}

/// The real, wall-clock-independent system clock.
#[derive(Clone, Default)]
pub struct SystemClock {
    started: std::sync::OnceLock<Instant>,
}

impl SystemClock {
    fn origin(&self) -> Instant {
        *self.started.get_or_init(Instant::now)
    }
}

impl Clock for SystemClock {
    fn uptime_millis(&self) -> u64 {
        self.now().duration_since(self.origin()).as_millis() as u64
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A controllable clock for deterministic tests of delayed dispatch.
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<Instant>>,
    uptime_millis: Arc<Mutex<u64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(Instant::now())),
            uptime_millis: Arc::new(Mutex::new(0)),
        }
    }

    /// Advances both the `Instant` and the uptime counter together.
    pub fn advance(&self, duration: Duration) {
        *self.current.lock() += duration;
        *self.uptime_millis.lock() += duration.as_millis() as u64;
    }

    pub fn set_uptime_millis(&self, ms: u64) {
        *self.uptime_millis.lock() = ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn uptime_millis(&self) -> u64 {
        *self.uptime_millis.lock()
    }

    fn now(&self) -> Instant {
        *self.current.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
