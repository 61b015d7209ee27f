use std::sync::LazyLock;

use regex::Regex;

// Layered text heuristics for mining a balance out of the rendered
// dashboard. The page is a moving target, so each layer is a weaker
// but broader match than the one before it.

static RE_CURRENCY_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[¥￥$]\s*([0-9][0-9,]*(?:\.[0-9]+)?)").unwrap());

static RE_CURRENT_BALANCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"当前余额[^0-9¥￥$]{0,16}([0-9][0-9,]*(?:\.[0-9]+)?)").unwrap());

static RE_WALLET_BALANCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:钱包余额|账户余额)[^0-9¥￥$]{0,16}([0-9][0-9,]*(?:\.[0-9]+)?)").unwrap()
});

static RE_ANY_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9][0-9,]*\.[0-9]{1,2})").unwrap());

static RE_PLAN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(PRO|VIP|PLUS|BASIC)\b").unwrap());

static RE_DAYS_AFTER_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"剩余[^0-9]{0,8}([0-9]+)\s*天").unwrap());

static RE_DAYS_BEFORE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)\s*天(?:后重置|剩余)").unwrap());

/// Whether the document shows any balance-indicating text yet: a
/// currency symbol adjacent to digits, or one of the known labels.
pub fn has_balance_marker(text: &str) -> bool {
    RE_CURRENCY_AMOUNT.is_match(text)
        || text.contains("当前余额")
        || text.contains("钱包余额")
        || text.contains("账户余额")
}

/// Extract the most plausible balance amount, trying each heuristic in
/// priority order: symbol-prefixed number, current-balance label,
/// wallet/account-balance label, then any decimal-formatted number.
pub fn extract_amount(text: &str) -> Option<f64> {
    for re in [
        &*RE_CURRENCY_AMOUNT,
        &*RE_CURRENT_BALANCE,
        &*RE_WALLET_BALANCE,
        &*RE_ANY_DECIMAL,
    ] {
        if let Some(value) = first_number(re, text) {
            return Some(value);
        }
    }
    None
}

/// Subscription plan name, matched against the known plan vocabulary.
pub fn extract_plan_name(text: &str) -> Option<String> {
    RE_PLAN_NAME
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_uppercase())
}

/// Days remaining on the subscription, from text around a
/// remaining-days label.
pub fn extract_remaining_days(text: &str) -> Option<u32> {
    for re in [&*RE_DAYS_AFTER_LABEL, &*RE_DAYS_BEFORE_LABEL] {
        if let Some(days) = re
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
        {
            return Some(days);
        }
    }
    None
}

fn first_number(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}
