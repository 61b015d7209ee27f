use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cookie::Cookie;

/// The authenticated identity, reduced to the fields higher layers need.
///
/// The full cookie set travels separately (see `SessionManager`); this
/// struct is what gets inspected for expiry and shown in status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
    pub user_identifier: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Build a session from a harvested cookie set. The first
    /// session-like cookie supplies the token and expiry; without one,
    /// the first cookie stands in. Empty sets yield `None`.
    pub fn from_cookies(cookies: &[Cookie], now: DateTime<Utc>) -> Option<Self> {
        let primary = cookies
            .iter()
            .find(|c| c.is_session_like())
            .or_else(|| cookies.first())?;
        Some(Self {
            token: primary.value.clone(),
            expires_at: primary.expires_at,
            user_id: None,
            user_identifier: None,
            created_at: now,
        })
    }

    /// A session with a past expiry must be treated as absent everywhere.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now > expires_at,
            None => false,
        }
    }
}
