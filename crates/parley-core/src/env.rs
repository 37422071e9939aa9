//! Environment abstraction for deterministic testing.
//!
//! Decouples reducer logic and the scheduler from system resources (wall
//! clock, timers). Production uses [`SystemEnv`]; tests substitute a fixed
//! clock and rely on tokio's paused time for debounce windows.

use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};

/// Abstract environment providing time and async sleeping.
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards within one execution context
/// - `sleep()` completes no earlier than the requested duration
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time.
    ///
    /// Used to stamp locally created records such as optimistic chat
    /// messages. Subsequent calls must return times >= previous calls.
    fn now(&self) -> DateTime<Utc>;

    /// Sleeps for the specified duration.
    ///
    /// Only the scheduler calls this (debounce windows). Reducers must never
    /// await.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Production environment using the system clock and tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_env_time_advances() {
        let env = SystemEnv::new();

        let t1 = env.now();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = env.now();

        assert!(t2 > t1, "Time should advance");
    }

    #[tokio::test(start_paused = true)]
    async fn system_env_sleep_waits_for_duration() {
        let env = SystemEnv::new();

        let start = tokio::time::Instant::now();
        env.sleep(Duration::from_millis(250)).await;

        assert!(start.elapsed() >= Duration::from_millis(250));
    }
}
