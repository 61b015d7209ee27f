use chrono::Utc;
use reqwest::header::{CONTENT_TYPE, COOKIE, ORIGIN, REFERER, SET_COOKIE};
use reqwest::{Response, StatusCode, Url};
use serde_json::Value;

use crate::cookie::{self, Cookie};
use crate::error::AuthError;

/// The upstream rejects requests without a browser-looking agent.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15";

/// Performs the three-step credential login handshake against the
/// account site. The steps must run in order: the anti-forgery token
/// from step 1 is required by step 2, and only step 3 proves the
/// credentials were actually accepted.
pub struct AuthClient {
    http: reqwest::Client,
    base: Url,
}

impl AuthClient {
    pub fn new(base_url: &str) -> Result<Self, AuthError> {
        let base =
            Url::parse(base_url).map_err(|_| AuthError::InvalidUrl(base_url.to_string()))?;
        // The credential callback answers with a redirect on success;
        // following it would drop the Set-Cookie headers we harvest.
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { http, base })
    }

    /// Run the full handshake, returning the harvested cookie set.
    ///
    /// Every login starts from an empty cookie set, which is what clears
    /// stale session cookies from a previous login attempt.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Vec<Cookie>, AuthError> {
        let mut cookies = Vec::new();

        let csrf_token = self.fetch_csrf_token(&mut cookies).await?;
        self.submit_credentials(&mut cookies, identifier, password, &csrf_token)
            .await?;
        self.probe_session(&mut cookies).await?;

        if !cookies.iter().any(Cookie::confirms_login) {
            return Err(AuthError::LoginFailed);
        }
        Ok(cookies)
    }

    async fn fetch_csrf_token(&self, cookies: &mut Vec<Cookie>) -> Result<String, AuthError> {
        let resp = self
            .request(reqwest::Method::GET, "/api/auth/csrf", cookies)?
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        harvest_set_cookies(&resp, cookies);

        if resp.status() != StatusCode::OK {
            return Err(AuthError::CsrfFetchFailed(resp.status().as_u16()));
        }
        let body: Value = resp.json().await.map_err(|_| AuthError::CsrfParseFailed)?;
        csrf_from_json(&body)
    }

    async fn submit_credentials(
        &self,
        cookies: &mut Vec<Cookie>,
        identifier: &str,
        password: &str,
        csrf_token: &str,
    ) -> Result<(), AuthError> {
        let callback_url = self.endpoint("/login")?;
        let resp = self
            .request(reqwest::Method::POST, "/api/auth/callback/credentials", cookies)?
            .header("X-Auth-Return-Redirect", "1")
            .header(ORIGIN, self.base.origin().ascii_serialization())
            .form(&[
                ("identifier", identifier),
                ("password", password),
                ("csrfToken", csrf_token),
                ("callbackUrl", callback_url.as_str()),
            ])
            .send()
            .await?;
        harvest_set_cookies(&resp, cookies);

        // 2xx and 3xx both mean the callback accepted the submission; a
        // 401/403 here is a rejected form, not bad credentials (only the
        // session probe can tell those apart).
        if !callback_status_ok(resp.status().as_u16()) {
            return Err(AuthError::LoginFailed);
        }
        Ok(())
    }

    async fn probe_session(&self, cookies: &mut Vec<Cookie>) -> Result<(), AuthError> {
        let resp = self
            .request(reqwest::Method::GET, "/api/auth/session", cookies)?
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        harvest_set_cookies(&resp, cookies);

        if resp.status() != StatusCode::OK {
            return Err(AuthError::LoginFailed);
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|_| AuthError::InvalidCredentials)?;
        if !session_user_present(&body) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(())
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        cookies: &[Cookie],
    ) -> Result<reqwest::RequestBuilder, AuthError> {
        let url = self.endpoint(path)?;
        let referer = self.endpoint("/login")?;
        let mut builder = self
            .http
            .request(method, url)
            .header(REFERER, referer.as_str());
        if !cookies.is_empty() {
            builder = builder.header(COOKIE, cookie::cookie_header(cookies));
        }
        Ok(builder)
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.base
            .join(path)
            .map_err(|_| AuthError::InvalidUrl(path.to_string()))
    }
}

fn harvest_set_cookies(resp: &Response, cookies: &mut Vec<Cookie>) {
    let now = Utc::now();
    let incoming = resp
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|header| Cookie::parse_set_cookie(header, now));
    cookie::merge_cookies(cookies, incoming);
}

pub(crate) fn csrf_from_json(body: &Value) -> Result<String, AuthError> {
    body.get("csrfToken")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(AuthError::CsrfParseFailed)
}

pub(crate) fn callback_status_ok(status: u16) -> bool {
    (200..=399).contains(&status)
}

pub(crate) fn session_user_present(body: &Value) -> bool {
    matches!(body.get("user"), Some(user) if !user.is_null())
}
