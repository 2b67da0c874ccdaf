use crate::state::DegradationMode;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Persisted rate-limit record for one account
///
/// The daily counters and `degradation_mode` belong to `date_today`;
/// [`RateLimitState::normalize`] resets them when the calendar date moves on.
/// `backoff_until` is date-independent and only ever moves forward.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitState {
    /// When the most recent profile operation began
    pub last_profile_at: Option<DateTime<Utc>>,

    /// Local calendar date the daily counters apply to
    pub date_today: Option<NaiveDate>,

    /// Profile operations started on `date_today`
    pub profiles_today: u32,

    /// Rate-limit signals received on `date_today`
    pub rate_limit_count_today: u32,

    /// Lifetime rate-limit signals (diagnostic only)
    pub rate_limit_count: u64,

    /// When the most recent rate-limit signal was received
    pub last_rate_limit_at: Option<DateTime<Utc>>,

    /// No expensive operation may start before this instant
    pub backoff_until: Option<DateTime<Utc>>,

    /// Advice for callers on how much data to request
    pub degradation_mode: DegradationMode,
}

/// Daily snapshot exposed for observability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitMetrics {
    pub profiles_today: u32,
    pub rate_limit_count_today: u32,
    pub degradation_mode: DegradationMode,
}

/// What a rate-limit signal did to the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitOutcome {
    /// Mode after the transition
    pub mode: DegradationMode,

    /// Backoff deadline after the transition
    pub backoff_until: DateTime<Utc>,

    /// Signals received today, including this one
    pub count_today: u32,
}

impl RateLimitState {
    /// Creates an empty record: no activity, no backoff, day not yet rolled
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the day rollover for `today`
    ///
    /// Returns true if the daily counters were reset. Calling it again on the
    /// same day changes nothing.
    pub fn normalize(&mut self, today: NaiveDate) -> bool {
        if self.date_today == Some(today) {
            return false;
        }

        self.date_today = Some(today);
        self.profiles_today = 0;
        self.rate_limit_count_today = 0;
        self.degradation_mode = DegradationMode::Normal;
        true
    }

    /// Records that a profile operation started at `now`
    pub fn record_operation(&mut self, now: DateTime<FixedOffset>) {
        self.normalize(now.date_naive());
        self.last_profile_at = Some(now.with_timezone(&Utc));
        self.profiles_today = self.profiles_today.saturating_add(1);
    }

    /// Records a rate-limit signal received at `now`
    ///
    /// The first signal of a day backs off for `suggested_wait` and reduces
    /// the data callers request. Any further signal that day stops operations
    /// until 23:59:59 local time.
    pub fn record_rate_limit(
        &mut self,
        now: DateTime<FixedOffset>,
        suggested_wait: Duration,
    ) -> RateLimitOutcome {
        self.normalize(now.date_naive());

        let now_utc = now.with_timezone(&Utc);
        self.rate_limit_count_today = self.rate_limit_count_today.saturating_add(1);
        self.rate_limit_count = self.rate_limit_count.saturating_add(1);
        self.last_rate_limit_at = Some(now_utc);

        let target = if self.rate_limit_count_today == 1 {
            self.degradation_mode = DegradationMode::Reduced;
            add_wait(now_utc, suggested_wait)
        } else {
            self.degradation_mode = DegradationMode::Stopped;
            end_of_day(now)
        };
        let backoff_until = self.extend_backoff(target);

        RateLimitOutcome {
            mode: self.degradation_mode,
            backoff_until,
            count_today: self.rate_limit_count_today,
        }
    }

    /// Moves `backoff_until` forward to `target`, never backwards
    fn extend_backoff(&mut self, target: DateTime<Utc>) -> DateTime<Utc> {
        let until = match self.backoff_until {
            Some(current) if current > target => current,
            _ => target,
        };
        self.backoff_until = Some(until);
        until
    }

    /// Time left until the backoff expires (zero when not in backoff)
    pub fn backoff_remaining(&self, now: DateTime<Utc>) -> Duration {
        self.backoff_until
            .and_then(|until| (until - now).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }

    /// Returns true while `backoff_until` lies in the future
    pub fn is_in_backoff(&self, now: DateTime<Utc>) -> bool {
        !self.backoff_remaining(now).is_zero()
    }

    /// Time left before `min_delay` has passed since the last operation
    pub fn spacing_remaining(&self, now: DateTime<Utc>, min_delay: Duration) -> Duration {
        let Some(last) = self.last_profile_at else {
            return Duration::ZERO;
        };
        let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
        min_delay.saturating_sub(elapsed)
    }

    /// Returns true if one more operation today would exceed `cap`
    pub fn would_exceed_daily_cap(&self, cap: u32) -> bool {
        self.profiles_today >= cap
    }

    /// Operations still allowed today under `cap`
    pub fn daily_cap_remaining(&self, cap: u32) -> u32 {
        cap.saturating_sub(self.profiles_today)
    }

    pub fn metrics(&self) -> RateLimitMetrics {
        RateLimitMetrics {
            profiles_today: self.profiles_today,
            rate_limit_count_today: self.rate_limit_count_today,
            degradation_mode: self.degradation_mode,
        }
    }
}

/// Returns 23:59:59 of the local day containing `now`
pub fn end_of_day(now: DateTime<FixedOffset>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(23, 59, 59)
        .and_then(|local| local.and_local_timezone(*now.offset()).single())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc))
}

fn add_wait(now: DateTime<Utc>, wait: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(wait)
        .ok()
        .and_then(|wait| now.checked_add_signed(wait))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
