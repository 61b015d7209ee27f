use chrono::{DateTime, Duration, Utc};

use acm_balance::AccountBalance;
use acm_store::AppSettings;

use crate::notify::Alert;

/// Subscriptions with less than this fraction remaining are alerted on.
const LOW_SUBSCRIPTION_FRACTION: f64 = 0.20;

/// Decides which alerts a fresh snapshot warrants. The cooldown is
/// global: one emission timestamp suppresses both alert kinds.
pub struct AlertPolicy {
    cooldown: Duration,
}

impl AlertPolicy {
    pub fn new() -> Self {
        Self {
            cooldown: Duration::hours(24),
        }
    }

    #[cfg(test)]
    fn with_cooldown(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    /// Candidate alerts for `balance`, already gated on the user's
    /// notification setting and the cooldown window. Emitting the
    /// returned alerts must be paired with storing `now` as the shared
    /// last-alert timestamp.
    pub fn evaluate(
        &self,
        balance: &AccountBalance,
        settings: &AppSettings,
        last_alert: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        if !settings.notifications_enabled {
            return Vec::new();
        }
        if let Some(last) = last_alert {
            if now - last <= self.cooldown {
                return Vec::new();
            }
        }

        let mut alerts = Vec::new();
        if let Some(paygo) = &balance.pay_as_you_go {
            if paygo.current_balance < settings.low_balance_threshold {
                alerts.push(Alert::LowBalance {
                    balance: paygo.current_balance,
                    threshold: settings.low_balance_threshold,
                });
            }
        }
        if let Some(sub) = &balance.subscription {
            let remaining_fraction = 1.0 - sub.usage_fraction();
            if remaining_fraction < LOW_SUBSCRIPTION_FRACTION {
                alerts.push(Alert::LowSubscription {
                    plan_name: sub.plan_name.clone(),
                    remaining: sub.remaining_amount(),
                    total: sub.total_amount,
                });
            }
        }
        alerts
    }
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self::new()
    }
}
