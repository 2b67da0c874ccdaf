//! Integration tests for the coordinator
//!
//! These drive the public API end to end with a hand-driven clock and real
//! JSON/SQLite stores standing in for separate process runs.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use profile_throttle::config::{parse_config, StorageBackend, StorageConfig, ThrottleConfig};
use profile_throttle::state::end_of_day;
use profile_throttle::storage::{JsonFileStore, MemoryStore, SqliteStore};
use profile_throttle::{AccountKey, Clock, Coordinator, DegradationMode, ManualClock, StateStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn local(day: u32, hour: u32, min: u32, sec: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(-4 * 3600)
        .unwrap()
        .with_ymd_and_hms(2026, 10, day, hour, min, sec)
        .unwrap()
}

fn create_test_config(min_delay_seconds: u64, daily_cap: u32) -> ThrottleConfig {
    ThrottleConfig {
        min_delay_seconds,
        daily_cap,
        rate_limit_wait_seconds: 900,
    }
}

fn coordinator(
    store: impl StateStore + 'static,
    config: ThrottleConfig,
    clock: &ManualClock,
) -> Coordinator {
    Coordinator::new(Box::new(store), config).with_clock(Arc::new(clock.clone()))
}

#[tokio::test]
async fn test_daily_cap_scenario() {
    let clock = ManualClock::new(local(19, 9, 0, 0));
    let throttle = coordinator(MemoryStore::new(), create_test_config(1, 2), &clock);
    let account = AccountKey::default();

    throttle.wait_if_needed(&account).await;
    throttle.record_operation_started(&account);
    assert_eq!(throttle.profiles_today(&account), 1);
    assert!(!throttle.would_exceed_daily_cap(&account));

    throttle.wait_if_needed(&account).await;
    throttle.record_operation_started(&account);
    assert_eq!(throttle.profiles_today(&account), 2);

    assert!(throttle.would_exceed_daily_cap(&account));
    assert_eq!(throttle.daily_cap_remaining(&account), 0);
    // The second wait had to respect the one-second spacing
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);
}

#[tokio::test]
async fn test_cap_remaining_decrements_and_clamps() {
    let clock = ManualClock::new(local(19, 9, 0, 0));
    let throttle = coordinator(MemoryStore::new(), create_test_config(0, 5), &clock);
    let account = AccountKey::named("counter");

    for expected in (0..5).rev() {
        throttle.record_operation_started(&account);
        assert_eq!(throttle.daily_cap_remaining(&account), expected);
    }

    throttle.record_operation_started(&account);
    assert_eq!(throttle.daily_cap_remaining(&account), 0);
    assert!(throttle.would_exceed_daily_cap(&account));

    // Per-call cap override
    assert!(!throttle.would_exceed_daily_cap_with(&account, 10));
    assert_eq!(throttle.daily_cap_remaining_with(&account, 10), 4);
}

#[tokio::test]
async fn test_rate_limit_escalation_scenario() {
    let clock = ManualClock::new(local(19, 12, 0, 0));
    let throttle = coordinator(MemoryStore::new(), create_test_config(15, 100), &clock);
    let account = AccountKey::default();

    let first = throttle.record_rate_limit(&account, Some(Duration::from_secs(900)), None);
    assert_eq!(first.mode, DegradationMode::Reduced);
    assert_eq!(throttle.degradation_mode(&account), DegradationMode::Reduced);
    assert_eq!(
        throttle.backoff_remaining(&account),
        Duration::from_secs(900)
    );
    assert!(throttle.is_in_backoff(&account));

    clock.advance(Duration::from_secs(60));
    let second = throttle.record_rate_limit(&account, Some(Duration::from_secs(900)), None);
    assert_eq!(second.mode, DegradationMode::Stopped);
    assert_eq!(throttle.degradation_mode(&account), DegradationMode::Stopped);

    let end = end_of_day(clock.now());
    assert_eq!(second.backoff_until, end);
    assert_eq!(end, Utc.with_ymd_and_hms(2026, 10, 20, 3, 59, 59).unwrap());

    // 12:01:00 to 23:59:59 local
    let until_midnight = Duration::from_secs(11 * 3600 + 58 * 60 + 59);
    assert_eq!(throttle.backoff_remaining(&account), until_midnight);

    let metrics = throttle.metrics(&account);
    assert_eq!(metrics.rate_limit_count_today, 2);
    assert_eq!(metrics.profiles_today, 0);
}

#[tokio::test]
async fn test_backoff_ends_exactly_at_deadline() {
    let clock = ManualClock::new(local(19, 12, 0, 0));
    let throttle = coordinator(MemoryStore::new(), create_test_config(15, 100), &clock);
    let account = AccountKey::default();

    throttle.record_rate_limit(&account, Some(Duration::from_secs(120)), None);

    clock.advance(Duration::from_secs(119));
    assert!(throttle.is_in_backoff(&account));
    assert_eq!(throttle.backoff_remaining(&account), Duration::from_secs(1));

    clock.advance(Duration::from_secs(1));
    assert!(!throttle.is_in_backoff(&account));
    assert_eq!(throttle.backoff_remaining(&account), Duration::ZERO);
}

#[tokio::test]
async fn test_new_day_looks_like_fresh_account() {
    let clock = ManualClock::new(local(19, 9, 0, 0));
    let store = MemoryStore::new();
    let throttle = coordinator(store.clone(), create_test_config(15, 3), &clock);
    let account = AccountKey::default();

    for _ in 0..3 {
        throttle.record_operation_started(&account);
    }
    throttle.record_rate_limit(&account, None, None);
    throttle.record_rate_limit(&account, None, None);
    assert_eq!(throttle.degradation_mode(&account), DegradationMode::Stopped);

    clock.set(local(20, 8, 0, 0));

    let fresh_clock = ManualClock::new(local(20, 8, 0, 0));
    let fresh = coordinator(MemoryStore::new(), create_test_config(15, 3), &fresh_clock);

    assert_eq!(throttle.metrics(&account), fresh.metrics(&account));
    assert_eq!(
        throttle.degradation_mode(&account),
        fresh.degradation_mode(&account)
    );
    assert_eq!(
        throttle.daily_cap_remaining(&account),
        fresh.daily_cap_remaining(&account)
    );
    assert!(!throttle.is_in_backoff(&account));

    // Repeated reads on the same day change nothing
    assert_eq!(throttle.metrics(&account), fresh.metrics(&account));

    // Lifetime diagnostics survive the rollover
    assert_eq!(throttle.state(&account).rate_limit_count, 2);
}

#[tokio::test]
async fn test_back_to_back_waits_respect_spacing() {
    let clock = ManualClock::new(local(19, 9, 0, 0));
    let throttle = coordinator(MemoryStore::new(), create_test_config(15, 100), &clock);
    let account = AccountKey::default();

    assert_eq!(throttle.wait_if_needed(&account).await, Duration::ZERO);
    throttle.record_operation_started(&account);

    clock.advance(Duration::from_millis(2500));
    let waited = throttle.wait_if_needed(&account).await;

    assert_eq!(waited, Duration::from_millis(12_500));
}

#[tokio::test]
async fn test_real_clock_spacing() {
    let throttle = Coordinator::new(Box::new(MemoryStore::new()), create_test_config(15, 100));
    let account = AccountKey::default();

    throttle.record_operation_started(&account);
    let started = std::time::Instant::now();
    throttle
        .wait_if_needed_with(&account, Duration::from_millis(200))
        .await;

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(150), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(5));
}

#[tokio::test]
async fn test_cancelled_wait_writes_nothing() {
    let store = MemoryStore::new();
    let throttle = Coordinator::new(Box::new(store.clone()), create_test_config(15, 100));
    let account = AccountKey::default();

    throttle.record_operation_started(&account);
    let before = store.snapshot(&account);

    let result = tokio::time::timeout(
        Duration::from_millis(20),
        throttle.wait_if_needed(&account),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(store.snapshot(&account), before);
}

#[tokio::test]
async fn test_json_state_shared_across_runs() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("session.json");
    std::fs::write(&session, "{}").unwrap();
    let clock = ManualClock::new(local(19, 10, 0, 0));

    {
        let first_run = coordinator(
            JsonFileStore::new(dir.path().join("state")),
            create_test_config(15, 100),
            &clock,
        );
        let account = AccountKey::from_session_path(&session);
        first_run.record_operation_started(&account);
        first_run.record_rate_limit(&account, Some(Duration::from_secs(300)), Some("profile"));
    }

    clock.advance(Duration::from_secs(100));

    let second_run = coordinator(
        JsonFileStore::new(dir.path().join("state")),
        create_test_config(15, 100),
        &clock,
    );
    let same_account = AccountKey::from_session_path(&dir.path().join("./session.json"));

    assert_eq!(second_run.profiles_today(&same_account), 1);
    assert_eq!(
        second_run.degradation_mode(&same_account),
        DegradationMode::Reduced
    );
    assert_eq!(
        second_run.backoff_remaining(&same_account),
        Duration::from_secs(200)
    );

    let waited = second_run.wait_if_needed(&same_account).await;
    assert_eq!(waited, Duration::from_secs(200));

    // A different account is untouched
    assert_eq!(second_run.profiles_today(&AccountKey::default()), 0);
}

#[tokio::test]
async fn test_sqlite_state_roundtrip_across_runs() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("throttle.db");
    let clock = ManualClock::new(local(19, 10, 0, 0));
    let account = AccountKey::named("sqlite-account");

    let before = {
        let first_run = coordinator(
            SqliteStore::new(&db_path).unwrap(),
            create_test_config(15, 100),
            &clock,
        );
        first_run.record_operation_started(&account);
        first_run.record_rate_limit(&account, None, None);
        first_run.state(&account)
    };

    let second_run = coordinator(
        SqliteStore::new(&db_path).unwrap(),
        create_test_config(15, 100),
        &clock,
    );
    assert_eq!(second_run.state(&account), before);
}

#[tokio::test]
async fn test_corrupt_state_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path());
    let account = AccountKey::default();
    std::fs::write(store.path_for(&account), "garbage").unwrap();

    let clock = ManualClock::new(local(19, 10, 0, 0));
    let throttle = coordinator(store.clone(), create_test_config(15, 100), &clock);

    assert_eq!(throttle.wait_if_needed(&account).await, Duration::ZERO);
    assert_eq!(throttle.degradation_mode(&account), DegradationMode::Normal);

    // The next mutation overwrites the corrupt file with a valid record
    throttle.record_operation_started(&account);
    assert_eq!(store.load(&account).unwrap().unwrap().profiles_today, 1);
}

#[tokio::test]
async fn test_unwritable_store_does_not_fail_operations() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let clock = ManualClock::new(local(19, 10, 0, 0));
    let throttle = coordinator(
        JsonFileStore::new(blocker.join("state")),
        create_test_config(15, 100),
        &clock,
    );
    let account = AccountKey::default();

    throttle.record_operation_started(&account);
    let outcome = throttle.record_rate_limit(&account, None, None);

    assert_eq!(outcome.mode, DegradationMode::Reduced);
    assert_eq!(throttle.profiles_today(&account), 0);
}

#[tokio::test]
async fn test_from_config_builds_working_coordinator() {
    let dir = TempDir::new().unwrap();
    let toml = format!(
        "[throttle]\ndaily-cap = 7\n\n[storage]\nbackend = \"sqlite\"\npath = \"{}\"\n",
        dir.path().join("state.db").display()
    );
    let config = parse_config(&toml).unwrap();
    assert_eq!(config.storage.backend, StorageBackend::Sqlite);

    let throttle = Coordinator::from_config(&config).unwrap();
    let account = AccountKey::default();

    assert_eq!(throttle.config().daily_cap, 7);
    throttle.record_operation_started(&account);
    assert_eq!(throttle.daily_cap_remaining(&account), 6);

    let json_config = StorageConfig {
        backend: StorageBackend::Json,
        path: Some(dir.path().join("json").to_string_lossy().into_owned()),
    };
    assert!(profile_throttle::open_store(&json_config).is_ok());
}
