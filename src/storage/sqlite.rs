//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the StateStore trait.
//! Each account is one row keyed by the full account key.

use crate::state::{AccountKey, DegradationMode, RateLimitState};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StateStore, StorageError, StorageResult};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

/// Raw column values before parsing
struct StateRow {
    last_profile_at: Option<String>,
    date_today: Option<String>,
    profiles_today: u32,
    rate_limit_count_today: u32,
    rate_limit_count: i64,
    last_rate_limit_at: Option<String>,
    backoff_until: Option<String>,
    degradation_mode: String,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL lets a reader in one process run alongside a writer in another
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn, path: None })
    }
}

impl StateStore for SqliteStore {
    fn load(&self, account: &AccountKey) -> StorageResult<Option<RateLimitState>> {
        let row = self
            .conn
            .query_row(
                "SELECT last_profile_at, date_today, profiles_today, rate_limit_count_today,
                 rate_limit_count, last_rate_limit_at, backoff_until, degradation_mode
                 FROM rate_limit_state WHERE account = ?1",
                params![account.as_str()],
                |row| {
                    Ok(StateRow {
                        last_profile_at: row.get(0)?,
                        date_today: row.get(1)?,
                        profiles_today: row.get(2)?,
                        rate_limit_count_today: row.get(3)?,
                        rate_limit_count: row.get(4)?,
                        last_rate_limit_at: row.get(5)?,
                        backoff_until: row.get(6)?,
                        degradation_mode: row.get(7)?,
                    })
                },
            )
            .optional()?;

        row.map(parse_row).transpose()
    }

    fn save(&mut self, account: &AccountKey, state: &RateLimitState) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO rate_limit_state
             (account, last_profile_at, date_today, profiles_today, rate_limit_count_today,
              rate_limit_count, last_rate_limit_at, backoff_until, degradation_mode, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                account.as_str(),
                state.last_profile_at.map(|t| t.to_rfc3339()),
                state.date_today.map(|d| d.to_string()),
                state.profiles_today,
                state.rate_limit_count_today,
                i64::try_from(state.rate_limit_count).unwrap_or(i64::MAX),
                state.last_rate_limit_at.map(|t| t.to_rfc3339()),
                state.backoff_until.map(|t| t.to_rfc3339()),
                state.degradation_mode.to_db_string(),
                now,
            ],
        )?;
        tracing::trace!("Saved rate-limit state for {}", account.short());
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite:{}", path.display()),
            None => "sqlite::memory:".to_string(),
        }
    }
}

fn parse_row(row: StateRow) -> StorageResult<RateLimitState> {
    let degradation_mode =
        DegradationMode::from_db_string(&row.degradation_mode).ok_or_else(|| {
            StorageError::Serialization(format!(
                "unknown degradation mode '{}'",
                row.degradation_mode
            ))
        })?;

    let date_today = row
        .date_today
        .map(|s| {
            s.parse::<NaiveDate>()
                .map_err(|e| StorageError::Serialization(format!("bad date '{}': {}", s, e)))
        })
        .transpose()?;

    Ok(RateLimitState {
        last_profile_at: parse_timestamp(row.last_profile_at)?,
        date_today,
        profiles_today: row.profiles_today,
        rate_limit_count_today: row.rate_limit_count_today,
        rate_limit_count: u64::try_from(row.rate_limit_count).unwrap_or(0),
        last_rate_limit_at: parse_timestamp(row.last_rate_limit_at)?,
        backoff_until: parse_timestamp(row.backoff_until)?,
        degradation_mode,
    })
}

fn parse_timestamp(value: Option<String>) -> StorageResult<Option<DateTime<Utc>>> {
    value
        .map(|s| {
            s.parse::<DateTime<Utc>>()
                .map_err(|e| StorageError::Serialization(format!("bad timestamp '{}': {}", s, e)))
        })
        .transpose()
}
