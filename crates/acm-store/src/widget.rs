use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use acm_balance::AccountBalance;

/// Render-ready entry for the home-screen widget host. The host reads
/// this from the shared store on its own timeline; the daemon never
/// pushes data into the widget process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetSnapshot {
    pub at: DateTime<Utc>,
    pub balance: Option<AccountBalance>,
    pub is_logged_in: bool,
    pub error_message: Option<String>,
}

impl WidgetSnapshot {
    pub fn new(at: DateTime<Utc>, balance: AccountBalance) -> Self {
        Self {
            at,
            balance: Some(balance),
            is_logged_in: true,
            error_message: None,
        }
    }

    /// Entry shown while no account is connected.
    pub fn logged_out(at: DateTime<Utc>) -> Self {
        Self {
            at,
            balance: None,
            is_logged_in: false,
            error_message: Some("请先登录".to_string()),
        }
    }

    /// Preview entry for widget galleries.
    pub fn placeholder(at: DateTime<Utc>) -> Self {
        use acm_balance::{FetchStrategy, PayAsYouGoBalance, SubscriptionBalance};
        Self {
            at,
            balance: Some(AccountBalance {
                subscription: Some(SubscriptionBalance {
                    plan_name: "PRO".to_string(),
                    used_amount: 50.0,
                    total_amount: 100.0,
                    unit: "天".to_string(),
                    reset_date: None,
                }),
                pay_as_you_go: Some(PayAsYouGoBalance {
                    current_balance: 305.0,
                    currency: "CNY".to_string(),
                    monthly_spent: Some(10.0),
                }),
                last_updated: at,
                user_identifier: Some("user@example.com".to_string()),
                fetched_via: FetchStrategy::Lightweight,
            }),
            is_logged_in: true,
            error_message: None,
        }
    }
}
