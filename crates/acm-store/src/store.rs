use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use acm_balance::AccountBalance;

use crate::migrations;
use crate::settings::AppSettings;
use crate::widget::WidgetSnapshot;

const KEY_BALANCE: &str = "cached_balance";
const KEY_LOGIN_STATE: &str = "is_logged_in";
const KEY_LAST_UPDATE: &str = "last_update_time";
const KEY_SETTINGS: &str = "app_settings";
const KEY_LAST_ALERT: &str = "last_notification_time";
const KEY_WIDGET: &str = "widget_entry";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("shared store unavailable: {0}")]
    NoContainer(#[source] rusqlite::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("snapshot could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Cross-process key-value store holding the last-known balance, login
/// flag, timestamps, and settings. Every display surface reads this;
/// nothing else is a source of truth.
///
/// Writes are full-snapshot replacements at infrequent cadence, so
/// last-write-wins is acceptable and no cross-key transaction is used.
/// Reads treat any deserialization failure as "absent".
pub struct SharedStore {
    conn: Mutex<Connection>,
}

impl SharedStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(StoreError::NoContainer)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::NoContainer)?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // -- Balance ------------------------------------------------------

    pub fn put_balance(&self, balance: &AccountBalance) -> Result<(), StoreError> {
        self.put_json(KEY_BALANCE, balance)
    }

    pub fn get_balance(&self) -> Option<AccountBalance> {
        self.get_json(KEY_BALANCE)
    }

    // -- Login state --------------------------------------------------

    pub fn put_login_state(&self, is_logged_in: bool) -> Result<(), StoreError> {
        self.put_json(KEY_LOGIN_STATE, &is_logged_in)
    }

    pub fn get_login_state(&self) -> bool {
        self.get_json(KEY_LOGIN_STATE).unwrap_or(false)
    }

    // -- Last update --------------------------------------------------

    pub fn put_last_update(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.put_json(KEY_LAST_UPDATE, &at)
    }

    pub fn get_last_update(&self) -> Option<DateTime<Utc>> {
        self.get_json(KEY_LAST_UPDATE)
    }

    // -- Settings -----------------------------------------------------

    pub fn put_settings(&self, settings: &AppSettings) -> Result<(), StoreError> {
        self.put_json(KEY_SETTINGS, settings)
    }

    /// Settings fall back to defaults when absent or unreadable.
    pub fn get_settings(&self) -> AppSettings {
        self.get_json(KEY_SETTINGS).unwrap_or_default()
    }

    // -- Alert cooldown -----------------------------------------------

    pub fn put_last_alert(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.put_json(KEY_LAST_ALERT, &at)
    }

    pub fn get_last_alert(&self) -> Option<DateTime<Utc>> {
        self.get_json(KEY_LAST_ALERT)
    }

    // -- Widget entry -------------------------------------------------

    pub fn put_widget_snapshot(&self, snapshot: &WidgetSnapshot) -> Result<(), StoreError> {
        self.put_json(KEY_WIDGET, snapshot)
    }

    pub fn get_widget_snapshot(&self) -> Option<WidgetSnapshot> {
        self.get_json(KEY_WIDGET)
    }

    // -- Clear --------------------------------------------------------

    /// Remove every stored key in one statement.
    pub fn clear_all(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM snapshots", [])?;
        Ok(())
    }

    // -- Internals ----------------------------------------------------

    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(value)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO snapshots (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            rusqlite::params![key, encoded],
        )?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let conn = self.conn.lock().unwrap();
        let encoded: String = conn
            .query_row(
                "SELECT value FROM snapshots WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .ok()?;
        match serde_json::from_str(&encoded) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("discarding unreadable snapshot for {key}: {e}");
                None
            }
        }
    }
}
