//! Rate-limit coordinator
//!
//! Every operation reads the account's record from the store, applies the
//! day rollover, and (for mutations) writes the whole record back. There is
//! no locking across processes; concurrent writers race and the last write
//! wins. Storage failures are logged and never reach the caller.

use crate::config::{Config, ThrottleConfig};
use crate::coordinator::clock::{Clock, SystemClock};
use crate::state::{
    AccountKey, DegradationMode, RateLimitMetrics, RateLimitOutcome, RateLimitState,
};
use crate::storage::{open_store, StateStore};
use crate::ThrottleError;
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Caller-facing verdict on whether to start an operation now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Go ahead, requesting data according to the mode
    Proceed(DegradationMode),

    /// Still backing off for this long
    Backoff(Duration),

    /// Repeated rate limits today; wait for tomorrow
    Stopped,

    /// Today's operation budget is used up
    DailyCapReached,
}

impl Admission {
    pub fn may_proceed(&self) -> bool {
        matches!(self, Self::Proceed(_))
    }
}

/// Shared pacing state for expensive profile operations
///
/// The coordinator is `Send + Sync`; wrap it in an `Arc` to share it between
/// tasks. The store mutex is held only for synchronous load/save work, never
/// across a sleep.
pub struct Coordinator {
    store: Mutex<Box<dyn StateStore>>,
    clock: Arc<dyn Clock>,
    config: ThrottleConfig,
}

impl Coordinator {
    /// Creates a coordinator over `store` using wall-clock time
    pub fn new(store: Box<dyn StateStore>, config: ThrottleConfig) -> Self {
        Self {
            store: Mutex::new(store),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Opens the configured store and builds a coordinator on top of it
    pub fn from_config(config: &Config) -> Result<Self, ThrottleError> {
        let store = open_store(&config.storage)?;
        Ok(Self::new(store, config.throttle.clone()))
    }

    /// Replaces the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    // ===== Waiting =====

    /// Suspends until the account is out of backoff and the configured
    /// minimum spacing has passed
    ///
    /// Returns the total time spent waiting. Nothing is recorded; call
    /// [`Coordinator::record_operation_started`] once the operation really
    /// begins.
    pub async fn wait_if_needed(&self, account: &AccountKey) -> Duration {
        self.wait_if_needed_with(account, self.config.min_delay())
            .await
    }

    /// Like [`Coordinator::wait_if_needed`] with an explicit minimum spacing
    pub async fn wait_if_needed_with(&self, account: &AccountKey, min_delay: Duration) -> Duration {
        let mut waited = Duration::ZERO;
        let (mut state, now) = self.load(account);

        let backoff = state.backoff_remaining(utc(now));
        if !backoff.is_zero() {
            tracing::warn!(
                "Rate-limit backoff active: waiting {}s before next profile (account={})",
                backoff.as_secs(),
                account.short()
            );
            self.clock.sleep(backoff).await;
            waited += backoff;

            // Another process may have extended the backoff while we slept
            let (reloaded, now) = self.load(account);
            let extra = reloaded.backoff_remaining(utc(now));
            if !extra.is_zero() {
                tracing::warn!(
                    "Backoff extended while waiting: {}s more (account={})",
                    extra.as_secs(),
                    account.short()
                );
                self.clock.sleep(extra).await;
                waited += extra;
            }
            state = reloaded;
        }

        let spacing = state.spacing_remaining(utc(self.clock.now()), min_delay);
        if !spacing.is_zero() {
            tracing::debug!(
                "Throttle: waiting {:.1}s before next profile",
                spacing.as_secs_f64()
            );
            self.clock.sleep(spacing).await;
            waited += spacing;
        }

        waited
    }

    // ===== Recording =====

    /// Records that a profile operation has just started
    pub fn record_operation_started(&self, account: &AccountKey) {
        let profiles_today = self.update(account, |state, now| {
            state.record_operation(now);
            state.profiles_today
        });
        tracing::debug!(
            "Profile operation started ({} today, account={})",
            profiles_today,
            account.short()
        );
    }

    /// Records that the remote service rejected a request for rate limiting
    ///
    /// `suggested_wait` falls back to the configured default; `endpoint` is
    /// only used for logging and defaults to `profile`.
    pub fn record_rate_limit(
        &self,
        account: &AccountKey,
        suggested_wait: Option<Duration>,
        endpoint: Option<&str>,
    ) -> RateLimitOutcome {
        let wait = suggested_wait.unwrap_or_else(|| self.config.rate_limit_wait());
        let (outcome, now) = self.update(account, |state, now| {
            (state.record_rate_limit(now, wait), now)
        });
        let endpoint = endpoint.unwrap_or("profile");

        if outcome.count_today == 1 {
            tracing::warn!(
                "Rate limit (first today): timestamp={} endpoint={} account={} -> reduced data mode, backoff {}s",
                now.to_rfc3339(),
                endpoint,
                account.short(),
                wait.as_secs()
            );
        } else {
            tracing::warn!(
                "Rate limit (repeated today, #{}): timestamp={} endpoint={} account={} -> stop until {}",
                outcome.count_today,
                now.to_rfc3339(),
                endpoint,
                account.short(),
                outcome.backoff_until.with_timezone(now.offset()).to_rfc3339()
            );
        }

        outcome
    }

    // ===== Queries =====

    pub fn is_in_backoff(&self, account: &AccountKey) -> bool {
        !self.backoff_remaining(account).is_zero()
    }

    /// Time left in backoff, zero when not backing off
    pub fn backoff_remaining(&self, account: &AccountKey) -> Duration {
        let (state, now) = self.load(account);
        state.backoff_remaining(utc(now))
    }

    pub fn would_exceed_daily_cap(&self, account: &AccountKey) -> bool {
        self.would_exceed_daily_cap_with(account, self.config.daily_cap)
    }

    pub fn would_exceed_daily_cap_with(&self, account: &AccountKey, cap: u32) -> bool {
        self.load(account).0.would_exceed_daily_cap(cap)
    }

    pub fn daily_cap_remaining(&self, account: &AccountKey) -> u32 {
        self.daily_cap_remaining_with(account, self.config.daily_cap)
    }

    pub fn daily_cap_remaining_with(&self, account: &AccountKey, cap: u32) -> u32 {
        self.load(account).0.daily_cap_remaining(cap)
    }

    /// Profile operations recorded today
    pub fn profiles_today(&self, account: &AccountKey) -> u32 {
        self.load(account).0.profiles_today
    }

    pub fn degradation_mode(&self, account: &AccountKey) -> DegradationMode {
        self.load(account).0.degradation_mode
    }

    pub fn metrics(&self, account: &AccountKey) -> RateLimitMetrics {
        self.load(account).0.metrics()
    }

    /// Full record as seen today
    pub fn state(&self, account: &AccountKey) -> RateLimitState {
        self.load(account).0
    }

    /// Decides whether a caller may start an operation right now
    ///
    /// Checks, in order: backoff, stopped mode, daily cap.
    pub fn admission(&self, account: &AccountKey) -> Admission {
        let (state, now) = self.load(account);

        let backoff = state.backoff_remaining(utc(now));
        if !backoff.is_zero() {
            return Admission::Backoff(backoff);
        }
        if !state.degradation_mode.allows_new_operations() {
            return Admission::Stopped;
        }
        if state.would_exceed_daily_cap(self.config.daily_cap) {
            return Admission::DailyCapReached;
        }
        Admission::Proceed(state.degradation_mode)
    }

    // ===== Persistence =====

    /// Loads the account's record with today's rollover applied
    ///
    /// Read failures and corrupt records fall back to an empty record.
    fn load(&self, account: &AccountKey) -> (RateLimitState, DateTime<FixedOffset>) {
        let store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        self.load_locked(&**store, account)
    }

    fn load_locked(
        &self,
        store: &dyn StateStore,
        account: &AccountKey,
    ) -> (RateLimitState, DateTime<FixedOffset>) {
        let mut state = match store.load(account) {
            Ok(Some(state)) => state,
            Ok(None) => RateLimitState::new(),
            Err(e) => {
                tracing::warn!(
                    "Could not load rate-limit state from {} (account={}): {}",
                    store.describe(),
                    account.short(),
                    e
                );
                RateLimitState::new()
            }
        };

        let now = self.clock.now();
        if state.normalize(now.date_naive()) {
            tracing::debug!(
                "New day {} for account {}: daily counters reset",
                now.date_naive(),
                account.short()
            );
        }
        (state, now)
    }

    /// Read-modify-write cycle for one account
    ///
    /// Write failures are logged; the computed result is returned regardless.
    fn update<T>(
        &self,
        account: &AccountKey,
        apply: impl FnOnce(&mut RateLimitState, DateTime<FixedOffset>) -> T,
    ) -> T {
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        let (mut state, now) = self.load_locked(&**store, account);

        let result = apply(&mut state, now);

        if let Err(e) = store.save(account, &state) {
            tracing::warn!(
                "Could not save rate-limit state to {} (account={}): {}",
                store.describe(),
                account.short(),
                e
            );
        }
        result
    }
}

fn utc(now: DateTime<FixedOffset>) -> DateTime<Utc> {
    now.with_timezone(&Utc)
}
