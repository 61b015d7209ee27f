use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_refresh_interval_minutes() -> u32 {
    1
}

fn default_low_balance_threshold() -> f64 {
    10.0
}

fn default_notifications_enabled() -> bool {
    true
}

/// User-tunable settings, persisted in the shared store so every
/// surface sees the same values. Writes are last-writer-wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_refresh_interval_minutes")]
    pub refresh_interval_minutes: u32,
    #[serde(default = "default_low_balance_threshold")]
    pub low_balance_threshold: f64,
    #[serde(default = "default_notifications_enabled")]
    pub notifications_enabled: bool,
    #[serde(default)]
    pub last_notification_at: Option<DateTime<Utc>>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            refresh_interval_minutes: default_refresh_interval_minutes(),
            low_balance_threshold: default_low_balance_threshold(),
            notifications_enabled: default_notifications_enabled(),
            last_notification_at: None,
        }
    }
}

impl AppSettings {
    /// The refresh interval as a duration. Values below one minute are
    /// lifted to one minute.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.refresh_interval_minutes.max(1)) * 60)
    }
}
