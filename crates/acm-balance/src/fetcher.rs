use std::sync::Arc;

use acm_auth::cookie::Cookie;
use acm_config::{MonitorConfig, StrategyPreference};

use crate::api::WalletApi;
use crate::error::BalanceError;
use crate::model::AccountBalance;
use crate::scrape::{PageScraper, ScrapeTimeouts};
use crate::surface::{HttpPage, PageSurface};

/// Single entry point over both fetch strategies.
///
/// The lightweight API is preferred; the rendered-page scrape is the
/// designed fallback for when the API contract is observed broken, not
/// an error path.
pub struct BalanceFetcher {
    api: WalletApi,
    scraper: PageScraper,
    preference: StrategyPreference,
}

impl BalanceFetcher {
    /// Build a fetcher from config, using the HTTP page surface for the
    /// scrape strategy.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, BalanceError> {
        let surface = Arc::new(HttpPage::new()?);
        Ok(Self::new(config, surface))
    }

    pub fn new(config: &MonitorConfig, surface: Arc<dyn PageSurface>) -> Result<Self, BalanceError> {
        let api = WalletApi::new(&config.base_url)?;
        let scraper = PageScraper::new(
            surface,
            config.dashboard_url(),
            ScrapeTimeouts::from(&config.scrape),
        );
        Ok(Self {
            api,
            scraper,
            preference: config.strategy,
        })
    }

    pub async fn fetch(&self, cookies: &[Cookie]) -> Result<AccountBalance, BalanceError> {
        if cookies.is_empty() {
            return Err(BalanceError::NotLoggedIn);
        }
        match self.preference {
            StrategyPreference::Api => self.api.fetch(cookies).await,
            StrategyPreference::Scrape => self.scraper.fetch(cookies).await,
            StrategyPreference::Auto => match self.api.fetch(cookies).await {
                Ok(balance) => Ok(balance),
                // A broken API contract is the one case the scrape was
                // built for; anything else is not its problem
                Err(err @ (BalanceError::RequestFailed(_) | BalanceError::Parse)) => {
                    tracing::warn!("wallet api unusable ({err}); falling back to page scrape");
                    self.scraper.fetch(cookies).await
                }
                Err(err) => Err(err),
            },
        }
    }
}
