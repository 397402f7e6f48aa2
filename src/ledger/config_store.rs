//! Per-user preference storage.
//!
//! A tiny key/value table keyed by (username, config_type). Strictly
//! best-effort: a failed read falls back to the caller's default and a failed
//! write just reports false — preferences are never worth an error page.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{info, warn};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS user_configs (
    username TEXT NOT NULL,
    config_type TEXT NOT NULL,
    config_value TEXT,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (username, config_type)
);
"#;

/// Best-effort per-user preferences.
pub struct UserConfigStore {
    conn: Arc<Mutex<Connection>>,
}

impl UserConfigStore {
    pub fn new(db_path: &str) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(db_path, flags)
            .with_context(|| format!("Failed to open config database at {}", db_path))?;

        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize user_configs schema")?;

        info!("⚙️  User config store initialized at: {}", db_path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Read one preference, falling back to `default` when unset or on any
    /// storage failure.
    pub fn get(&self, username: &str, key: &str, default: &str) -> String {
        let conn = self.conn.lock();
        let result = conn.query_row(
            "SELECT config_value FROM user_configs WHERE username = ?1 AND config_type = ?2",
            params![username, key],
            |row| row.get::<_, Option<String>>(0),
        );

        match result {
            Ok(Some(value)) => value,
            Ok(None) => default.to_string(),
            Err(rusqlite::Error::QueryReturnedNoRows) => default.to_string(),
            Err(e) => {
                warn!("Config read failed for {}/{}: {}", username, key, e);
                default.to_string()
            }
        }
    }

    /// Upsert one preference. Returns whether the write stuck.
    pub fn set(&self, username: &str, key: &str, value: &str) -> bool {
        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO user_configs (username, config_type, config_value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(username, config_type)
             DO UPDATE SET config_value = excluded.config_value, updated_at = excluded.updated_at",
            params![username, key, value, Utc::now().to_rfc3339()],
        );

        match result {
            Ok(_) => true,
            Err(e) => {
                warn!("Config write failed for {}/{}: {}", username, key, e);
                false
            }
        }
    }
}
