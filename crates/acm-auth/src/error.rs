use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("fetching the anti-forgery token failed (status {0})")]
    CsrfFetchFailed(u16),
    #[error("anti-forgery token missing from response")]
    CsrfParseFailed,
    #[error("login failed")]
    LoginFailed,
    #[error("account or password rejected")]
    InvalidCredentials,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
