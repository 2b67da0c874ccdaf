//! Database schema definitions
//!
//! This module contains the SQL schema for the rate-limit state database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One rate-limit record per account
CREATE TABLE IF NOT EXISTS rate_limit_state (
    account TEXT PRIMARY KEY,
    last_profile_at TEXT,
    date_today TEXT,
    profiles_today INTEGER NOT NULL DEFAULT 0,
    rate_limit_count_today INTEGER NOT NULL DEFAULT 0,
    rate_limit_count INTEGER NOT NULL DEFAULT 0,
    last_rate_limit_at TEXT,
    backoff_until TEXT,
    degradation_mode TEXT NOT NULL DEFAULT 'normal',
    updated_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_table_exists_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='rate_limit_state'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
