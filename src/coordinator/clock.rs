//! Time sources for the coordinator
//!
//! All calendar logic runs on local time (`DateTime<FixedOffset>`), and all
//! waiting goes through [`Clock::sleep`], so tests can drive both by hand.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Source of the current time and of cooperative suspension
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current local time
    fn now(&self) -> DateTime<FixedOffset>;

    /// Suspends the calling task for `duration`
    ///
    /// Dropping the returned future cancels the wait.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time with tokio timers
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let now = Local::now();
        now.with_timezone(now.offset())
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug)]
struct ManualState {
    now: DateTime<FixedOffset>,
    sleeps: Vec<Duration>,
}

/// Hand-driven clock
///
/// `sleep` returns immediately after moving the clock forward by the requested
/// duration and remembering it. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualState {
                now: start,
                sleeps: Vec::new(),
            })),
        }
    }

    /// Moves the clock forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.now = shift(state.now, duration);
    }

    /// Jumps to an arbitrary instant
    pub fn set(&self, now: DateTime<FixedOffset>) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).now = now;
    }

    /// Every duration passed to `sleep`, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .sleeps
            .clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).now
    }

    async fn sleep(&self, duration: Duration) {
        {
            let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            state.now = shift(state.now, duration);
            state.sleeps.push(duration);
        }
        tokio::task::yield_now().await;
    }
}

fn shift(now: DateTime<FixedOffset>, duration: Duration) -> DateTime<FixedOffset> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 19, 12, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_manual_sleep_advances_and_records() {
        let clock = ManualClock::new(noon());

        clock.sleep(Duration::from_secs(15)).await;
        clock.sleep(Duration::from_secs(5)).await;

        assert_eq!(clock.now(), noon() + chrono::Duration::seconds(20));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(15), Duration::from_secs(5)]
        );
        assert_eq!(clock.total_slept(), Duration::from_secs(20));
    }

    #[test]
    fn test_manual_advance_and_set() {
        let clock = ManualClock::new(noon());
        let shared = clock.clone();

        clock.advance(Duration::from_secs(60));
        assert_eq!(shared.now(), noon() + chrono::Duration::seconds(60));
        assert!(shared.sleeps().is_empty());

        clock.set(noon());
        assert_eq!(shared.now(), noon());
    }

    #[tokio::test]
    async fn test_system_clock_sleeps() {
        let clock = SystemClock;
        let before = std::time::Instant::now();
        clock.sleep(Duration::from_millis(20)).await;
        assert!(before.elapsed() >= Duration::from_millis(20));

        let delta = (Local::now().timestamp() - clock.now().timestamp()).abs();
        assert!(delta <= 1);
    }
}
