//! Manually driven clock.

use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use parley_core::Environment;

/// Test environment with a shared, explicitly advanced wall clock.
///
/// Each `now()` call also advances the clock by the configured tick so that
/// consecutive optimistic messages get distinct, increasing timestamps.
/// Sleeping delegates to tokio, so debounce windows follow paused test time.
#[derive(Debug, Clone)]
pub struct TestEnv {
    clock: Arc<Mutex<DateTime<Utc>>>,
    tick: TimeDelta,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    /// Clock starting at 2024-05-01 12:00 UTC, advancing one second per read.
    pub fn new() -> Self {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().unwrap_or_default();
        Self::starting_at(start, TimeDelta::seconds(1))
    }

    /// Clock starting at `start`, advancing `tick` per read.
    pub fn starting_at(start: DateTime<Utc>, tick: TimeDelta) -> Self {
        Self { clock: Arc::new(Mutex::new(start)), tick }
    }

    /// Current reading without advancing.
    pub fn peek(&self) -> DateTime<Utc> {
        *self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the clock forward.
    pub fn advance(&self, by: TimeDelta) {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        *clock += by;
    }
}

impl Environment for TestEnv {
    fn now(&self) -> DateTime<Utc> {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        let now = *clock;
        *clock += self.tick;
        now
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
