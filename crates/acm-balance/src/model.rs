use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which strategy produced a balance snapshot. Display surfaces show a
/// slow-path indicator for scraped snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStrategy {
    Lightweight,
    RenderedScrape,
}

/// Immutable snapshot of the account's balances. Each fetch produces a
/// brand-new snapshot that fully replaces the previous one in the
/// shared store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub subscription: Option<SubscriptionBalance>,
    pub pay_as_you_go: Option<PayAsYouGoBalance>,
    pub last_updated: DateTime<Utc>,
    pub user_identifier: Option<String>,
    pub fetched_via: FetchStrategy,
}

impl AccountBalance {
    /// A snapshot with neither balance is a fetch failure, not a
    /// zero-balance state.
    pub fn is_valid(&self) -> bool {
        self.subscription.is_some() || self.pay_as_you_go.is_some()
    }
}

/// A period-bound quota (days, currency credit) on a named plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionBalance {
    pub plan_name: String,
    pub used_amount: f64,
    pub total_amount: f64,
    /// Unit of the amounts in the plan's own terms, e.g. "CNY" or "天".
    pub unit: String,
    pub reset_date: Option<DateTime<Utc>>,
}

impl SubscriptionBalance {
    pub fn remaining_amount(&self) -> f64 {
        (self.total_amount - self.used_amount).max(0.0)
    }

    /// Fraction of the quota consumed, clamped to [0, 1]. A zero total
    /// reads as nothing used.
    pub fn usage_fraction(&self) -> f64 {
        if self.total_amount <= 0.0 {
            return 0.0;
        }
        (self.used_amount / self.total_amount).clamp(0.0, 1.0)
    }
}

/// A decrementing currency balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayAsYouGoBalance {
    pub current_balance: f64,
    pub currency: String,
    pub monthly_spent: Option<f64>,
}

impl PayAsYouGoBalance {
    /// Currency-aware display string, two fraction digits.
    pub fn formatted(&self) -> String {
        match self.currency.as_str() {
            "CNY" => format!("¥{:.2}", self.current_balance),
            "USD" => format!("${:.2}", self.current_balance),
            code => format!("{} {:.2}", code, self.current_balance),
        }
    }
}
