use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::cookie::Cookie;
use crate::session::Session;
use crate::vault::{CredentialVault, VaultError};

const SESSION_KEY: &str = "user_session";
const COOKIES_KEY: &str = "auth_cookies";
const TOKEN_KEY: &str = "session_token";

/// Owns the vault records for the authenticated identity: the session
/// summary, the raw cookie set, and the bare token.
///
/// Reads soften every failure to "absent" so a corrupt or missing vault
/// degrades to the logged-out state instead of crashing the monitor.
pub struct SessionManager {
    vault: Arc<dyn CredentialVault>,
}

impl SessionManager {
    pub fn new(vault: Arc<dyn CredentialVault>) -> Self {
        Self { vault }
    }

    /// The current session, or `None` when absent or expired. An expired
    /// session also clears the stored credentials so later loads don't
    /// keep rediscovering it.
    pub fn load(&self, now: DateTime<Utc>) -> Option<Session> {
        let session: Session = self.read_json(SESSION_KEY)?;
        if session.is_expired(now) {
            tracing::info!("stored session expired; clearing credentials");
            self.clear();
            return None;
        }
        Some(session)
    }

    /// The raw cookie set attached to the session (empty when logged out).
    pub fn cookies(&self) -> Vec<Cookie> {
        self.read_json(COOKIES_KEY).unwrap_or_default()
    }

    /// Persist a successful login: the cookie set plus the session
    /// derived from it.
    pub fn store_login(
        &self,
        cookies: &[Cookie],
        now: DateTime<Utc>,
    ) -> Result<Session, VaultError> {
        let session = Session::from_cookies(cookies, now).ok_or(VaultError::EncodingFailed)?;
        let cookie_bytes = serde_json::to_vec(cookies).map_err(|_| VaultError::EncodingFailed)?;
        let session_bytes =
            serde_json::to_vec(&session).map_err(|_| VaultError::EncodingFailed)?;

        self.vault.save(COOKIES_KEY, &cookie_bytes)?;
        self.vault.save(SESSION_KEY, &session_bytes)?;
        self.vault.save(TOKEN_KEY, session.token.as_bytes())?;
        Ok(session)
    }

    /// Best-effort removal of every credential record.
    pub fn clear(&self) {
        for key in [SESSION_KEY, COOKIES_KEY, TOKEN_KEY] {
            if let Err(e) = self.vault.delete(key) {
                tracing::warn!("failed to delete vault record {key}: {e}");
            }
        }
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.vault.load(key).ok().flatten()?;
        serde_json::from_slice(&bytes).ok()
    }
}
