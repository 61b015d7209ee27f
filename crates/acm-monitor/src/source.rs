use async_trait::async_trait;
use chrono::Utc;

use acm_auth::SessionManager;
use acm_balance::{AccountBalance, BalanceError, BalanceFetcher};

/// What the refresh scheduler polls. Separated from the fetcher so the
/// scheduler can be exercised without a network or vault behind it.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn fetch(&self) -> Result<AccountBalance, BalanceError>;
}

/// Production source: resolves the session from the credential vault,
/// refuses expired or absent sessions, then runs the dual-strategy
/// fetcher with the stored cookies.
pub struct VaultBalanceSource {
    sessions: SessionManager,
    fetcher: BalanceFetcher,
}

impl VaultBalanceSource {
    pub fn new(sessions: SessionManager, fetcher: BalanceFetcher) -> Self {
        Self { sessions, fetcher }
    }
}

#[async_trait]
impl BalanceSource for VaultBalanceSource {
    async fn fetch(&self) -> Result<AccountBalance, BalanceError> {
        // An expired session is treated as absent; it must never reach
        // the fetcher as if it were valid.
        if self.sessions.load(Utc::now()).is_none() {
            return Err(BalanceError::NotLoggedIn);
        }
        let cookies = self.sessions.cookies();
        self.fetcher.fetch(&cookies).await
    }
}
