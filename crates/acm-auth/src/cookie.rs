use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A single upstream cookie, reduced to the fields the monitor needs.
///
/// The raw cookie set is an opaque attachment on the session: only the
/// auth and balance layers ever look inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires_at: None,
        }
    }

    /// Parse a `Set-Cookie` header value. `Max-Age` wins over `Expires`
    /// when both are present. Returns `None` for headers without a
    /// `name=value` pair.
    pub fn parse_set_cookie(header: &str, now: DateTime<Utc>) -> Option<Self> {
        let mut segments = header.split(';');
        let (name, value) = segments.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut expires_at = None;
        let mut max_age = None;
        for segment in segments {
            let (key, val) = match segment.split_once('=') {
                Some((k, v)) => (k.trim().to_ascii_lowercase(), v.trim()),
                None => continue,
            };
            match key.as_str() {
                "max-age" => max_age = val.parse::<i64>().ok(),
                "expires" => {
                    expires_at = DateTime::parse_from_rfc2822(val)
                        .ok()
                        .map(|d| d.with_timezone(&Utc));
                }
                _ => {}
            }
        }
        if let Some(seconds) = max_age {
            expires_at = Some(now + Duration::seconds(seconds));
        }

        Some(Self {
            name: name.to_string(),
            value: value.trim().to_string(),
            expires_at,
        })
    }

    /// Whether the cookie name matches the session-like heuristics used
    /// to pick the credential that represents the authenticated identity.
    pub fn is_session_like(&self) -> bool {
        let name = self.name.to_ascii_lowercase();
        ["session", "token", "auth", "jwt", "sid"]
            .iter()
            .any(|marker| name.contains(marker))
    }

    /// Stricter check used to confirm the login handshake actually set a
    /// session: only a `session` cookie or the auth-library marker counts.
    pub fn confirms_login(&self) -> bool {
        let name = self.name.to_ascii_lowercase();
        name.contains("session") || name.contains("authjs")
    }
}

/// Render a `Cookie:` request header for the given cookie set.
pub fn cookie_header(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fold `incoming` into `cookies`, replacing same-named entries.
pub fn merge_cookies(cookies: &mut Vec<Cookie>, incoming: impl IntoIterator<Item = Cookie>) {
    for cookie in incoming {
        match cookies.iter_mut().find(|c| c.name == cookie.name) {
            Some(existing) => *existing = cookie,
            None => cookies.push(cookie),
        }
    }
}
