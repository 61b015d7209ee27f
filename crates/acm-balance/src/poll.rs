use std::future::Future;
use std::time::Duration;

use crate::error::BalanceError;

/// Poll `check` every `interval` until it yields a value or `timeout`
/// elapses. The rendered-page strategy uses this for its bounded waits
/// instead of blocking sleeps.
pub async fn wait_for<T, F, Fut>(
    what: &'static str,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Result<T, BalanceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(value) = check().await {
            return Ok(value);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(BalanceError::Timeout(what));
        }
        tokio::time::sleep(interval).await;
    }
}
