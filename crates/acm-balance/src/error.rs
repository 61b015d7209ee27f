use thiserror::Error;

#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("wallet request failed: {0}")]
    RequestFailed(String),
    #[error("balance payload could not be parsed")]
    Parse,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("page script failed: {0}")]
    Javascript(String),
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
}

// Transport failures count as request failures; the caller cannot do
// anything different for the two.
impl From<reqwest::Error> for BalanceError {
    fn from(err: reqwest::Error) -> Self {
        BalanceError::RequestFailed(err.to_string())
    }
}
