/// A threshold-crossing alert produced by the alert policy.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    LowBalance {
        balance: f64,
        threshold: f64,
    },
    LowSubscription {
        plan_name: String,
        remaining: f64,
        total: f64,
    },
}

impl Alert {
    pub fn title(&self) -> &'static str {
        match self {
            Alert::LowBalance { .. } => "余额不足提醒",
            Alert::LowSubscription { .. } => "订阅额度不足提醒",
        }
    }

    pub fn body(&self) -> String {
        match self {
            Alert::LowBalance { balance, threshold } => format!(
                "您的 AICodeMirror 余额为 ¥{balance:.2}，已低于 ¥{threshold:.2} 阈值，请及时充值。"
            ),
            Alert::LowSubscription {
                plan_name,
                remaining,
                total,
            } => {
                let percentage = if *total > 0.0 {
                    remaining / total * 100.0
                } else {
                    0.0
                };
                format!(
                    "您的 {plan_name} 套餐剩余 {percentage:.0}%（{remaining:.0}/{total:.0}），请注意使用。"
                )
            }
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Alert::LowBalance { .. } => "LOW_BALANCE",
            Alert::LowSubscription { .. } => "LOW_SUBSCRIPTION",
        }
    }
}

/// Adapter over the platform notification center.
pub trait Notifier: Send + Sync {
    fn request_permission(&self) -> bool;
    fn send(&self, title: &str, body: &str, category: &str);
    fn clear_pending(&self);
    fn clear_delivered(&self);
}

/// Notifier that writes alerts to the log. The daemon's default on
/// hosts without a notification center binding.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn request_permission(&self) -> bool {
        true
    }

    fn send(&self, title: &str, body: &str, category: &str) {
        tracing::warn!(category, "{title}: {body}");
    }

    fn clear_pending(&self) {}

    fn clear_delivered(&self) {}
}
