use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use acm_auth::cookie::Cookie;
use acm_config::ScrapeConfig;

use crate::error::BalanceError;
use crate::extract;
use crate::model::{AccountBalance, FetchStrategy, PayAsYouGoBalance, SubscriptionBalance};
use crate::poll::wait_for;
use crate::surface::PageSurface;

#[derive(Debug, Clone, Copy)]
pub struct ScrapeTimeouts {
    pub page_load: Duration,
    pub marker: Duration,
    pub poll: Duration,
    pub settle: Duration,
}

impl Default for ScrapeTimeouts {
    fn default() -> Self {
        Self {
            page_load: Duration::from_secs(20),
            marker: Duration::from_secs(10),
            poll: Duration::from_millis(500),
            settle: Duration::from_millis(1000),
        }
    }
}

impl From<&ScrapeConfig> for ScrapeTimeouts {
    fn from(config: &ScrapeConfig) -> Self {
        Self {
            page_load: Duration::from_secs(config.page_load_timeout_secs),
            marker: Duration::from_secs(config.marker_timeout_secs),
            poll: Duration::from_millis(config.poll_interval_ms),
            settle: Duration::from_millis(config.settle_delay_ms),
        }
    }
}

/// Fallback strategy: render the dashboard page and text-mine it.
///
/// This exists because the wallet API is neither stable nor complete;
/// when it breaks, the page is the contract of last resort.
pub struct PageScraper {
    surface: Arc<dyn PageSurface>,
    page_url: String,
    timeouts: ScrapeTimeouts,
}

impl PageScraper {
    pub fn new(surface: Arc<dyn PageSurface>, page_url: String, timeouts: ScrapeTimeouts) -> Self {
        Self {
            surface,
            page_url,
            timeouts,
        }
    }

    pub async fn fetch(&self, cookies: &[Cookie]) -> Result<AccountBalance, BalanceError> {
        let surface = self.surface.as_ref();
        surface.load(&self.page_url, cookies).await?;

        // Page-load wait is fatal on timeout
        wait_for(
            "page load",
            self.timeouts.page_load,
            self.timeouts.poll,
            move || async move {
                match surface.poll_ready().await {
                    Ok(true) => Some(Ok(())),
                    Ok(false) => None,
                    Err(e) => Some(Err(e)),
                }
            },
        )
        .await??;

        // Marker wait is best-effort: a page that never shows a marker
        // may still contain something extractable
        let marker = wait_for(
            "balance markers",
            self.timeouts.marker,
            self.timeouts.poll,
            move || async move {
                match surface.document_text().await {
                    Ok(text) if extract::has_balance_marker(&text) => Some(Ok(())),
                    Ok(_) => {
                        let _ = surface.reload().await;
                        None
                    }
                    Err(e) => Some(Err(e)),
                }
            },
        )
        .await;
        match marker {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(BalanceError::Timeout(what)) => {
                tracing::debug!("{what} never appeared; extracting best-effort");
            }
            Err(e) => return Err(e),
        }

        // Let late-rendering values settle before the final read
        tokio::time::sleep(self.timeouts.settle).await;

        let text = surface.document_text().await?;
        snapshot_from_text(&text, Utc::now())
    }
}

/// Build a snapshot from the rendered document text. Anything found is
/// reported; nothing found is a parse failure, not a zero balance.
pub fn snapshot_from_text(
    text: &str,
    now: DateTime<Utc>,
) -> Result<AccountBalance, BalanceError> {
    let pay_as_you_go = extract::extract_amount(text).map(|current_balance| PayAsYouGoBalance {
        current_balance,
        currency: "CNY".to_string(),
        monthly_spent: None,
    });

    let subscription = extract::extract_plan_name(text).map(|plan_name| SubscriptionBalance {
        plan_name,
        used_amount: 0.0,
        total_amount: extract::extract_remaining_days(text)
            .map(f64::from)
            .unwrap_or(0.0),
        unit: "天".to_string(),
        reset_date: None,
    });

    if subscription.is_none() && pay_as_you_go.is_none() {
        return Err(BalanceError::Parse);
    }
    Ok(AccountBalance {
        subscription,
        pay_as_you_go,
        last_updated: now,
        user_identifier: None,
        fetched_via: FetchStrategy::RenderedScrape,
    })
}
