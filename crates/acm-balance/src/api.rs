use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, CACHE_CONTROL, COOKIE, PRAGMA};
use reqwest::{StatusCode, Url};
use serde_json::Value;

use acm_auth::cookie::{self, Cookie};

use crate::error::BalanceError;
use crate::model::{AccountBalance, FetchStrategy, PayAsYouGoBalance, SubscriptionBalance};

/// The wallet endpoint reports amounts as integer strings in
/// thousandths of a yuan.
const MINOR_UNITS_PER_YUAN: f64 = 1000.0;

/// Lightweight strategy: one GET against the wallet API with the
/// session cookies attached and caching disabled.
pub struct WalletApi {
    http: reqwest::Client,
    endpoint: Url,
}

impl WalletApi {
    pub fn new(base_url: &str) -> Result<Self, BalanceError> {
        let base =
            Url::parse(base_url).map_err(|_| BalanceError::InvalidUrl(base_url.to_string()))?;
        let endpoint = base
            .join("/api/wallet")
            .map_err(|_| BalanceError::InvalidUrl(base_url.to_string()))?;
        let http = reqwest::Client::builder()
            .user_agent(acm_auth::client::BROWSER_USER_AGENT)
            .build()?;
        Ok(Self { http, endpoint })
    }

    pub async fn fetch(&self, cookies: &[Cookie]) -> Result<AccountBalance, BalanceError> {
        let resp = self
            .http
            .get(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .header(COOKIE, cookie::cookie_header(cookies))
            .send()
            .await?;

        if resp.status() != StatusCode::OK {
            return Err(BalanceError::RequestFailed(format!(
                "wallet endpoint returned {}",
                resp.status()
            )));
        }
        let body: Value = resp.json().await.map_err(|_| BalanceError::Parse)?;
        parse_wallet_payload(&body, Utc::now())
    }
}

/// Parse `{"success": true, "data": {"balance": "…", "bonusBalance": "…"}}`.
///
/// `balance` becomes the subscription total with zero used: the wallet
/// reports remaining capacity, not a used/total split, so the usage bar
/// reads 0% for API-fetched snapshots. `bonusBalance` becomes the
/// pay-as-you-go balance.
pub fn parse_wallet_payload(
    body: &Value,
    now: DateTime<Utc>,
) -> Result<AccountBalance, BalanceError> {
    if body.get("success").and_then(Value::as_bool) != Some(true) {
        return Err(BalanceError::Parse);
    }
    let data = body
        .get("data")
        .and_then(Value::as_object)
        .ok_or(BalanceError::Parse)?;

    let subscription = data
        .get("balance")
        .and_then(Value::as_str)
        .and_then(yuan_from_minor_units)
        .map(|amount| SubscriptionBalance {
            plan_name: "PRO".to_string(),
            used_amount: 0.0,
            total_amount: amount,
            unit: "CNY".to_string(),
            reset_date: None,
        });

    let pay_as_you_go = data
        .get("bonusBalance")
        .and_then(Value::as_str)
        .and_then(yuan_from_minor_units)
        .map(|amount| PayAsYouGoBalance {
            current_balance: amount,
            currency: "CNY".to_string(),
            monthly_spent: None,
        });

    if subscription.is_none() && pay_as_you_go.is_none() {
        return Err(BalanceError::Parse);
    }
    Ok(AccountBalance {
        subscription,
        pay_as_you_go,
        last_updated: now,
        user_identifier: None,
        fetched_via: FetchStrategy::Lightweight,
    })
}

fn yuan_from_minor_units(raw: &str) -> Option<f64> {
    raw.parse::<i64>().ok().map(|v| v as f64 / MINOR_UNITS_PER_YUAN)
}
