use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::Url;
use thiserror::Error;
use tokio::sync::RwLock;

use acm_auth::cookie::{self, Cookie};

use crate::error::BalanceError;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("page load failed: {0}")]
    Load(String),
    #[error("page script failed: {0}")]
    Script(String),
}

impl From<SurfaceError> for BalanceError {
    fn from(err: SurfaceError) -> Self {
        match err {
            SurfaceError::Load(detail) => BalanceError::RequestFailed(detail),
            SurfaceError::Script(detail) => BalanceError::Javascript(detail),
        }
    }
}

/// An isolated, non-persistent page rendering context.
///
/// The scraper drives this through its load/poll/reload cycle; the
/// default implementation fetches the raw page over HTTP, while a
/// script-executing surface can report in-page failures as
/// `SurfaceError::Script`.
#[async_trait]
pub trait PageSurface: Send + Sync {
    /// Begin loading `url` with `cookies` attached.
    async fn load(&self, url: &str, cookies: &[Cookie]) -> Result<(), SurfaceError>;

    /// True once the page has finished loading. May advance the load.
    async fn poll_ready(&self) -> Result<bool, SurfaceError>;

    /// Re-render the document. Live surfaces may treat this as a no-op
    /// because their document updates on its own.
    async fn reload(&self) -> Result<(), SurfaceError>;

    /// The current rendered document text.
    async fn document_text(&self) -> Result<String, SurfaceError>;
}

#[derive(Default)]
struct PageState {
    url: Option<Url>,
    cookie_header: String,
    html: Option<String>,
}

/// `PageSurface` over a plain HTTP fetch of the page markup. Each
/// `load` starts from a blank state, so no cookies or documents leak
/// between fetches.
pub struct HttpPage {
    http: reqwest::Client,
    state: RwLock<PageState>,
}

impl HttpPage {
    pub fn new() -> Result<Self, BalanceError> {
        let http = reqwest::Client::builder()
            .user_agent(acm_auth::client::BROWSER_USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            state: RwLock::new(PageState::default()),
        })
    }

    async fn try_fetch(&self) -> Result<bool, SurfaceError> {
        let (url, cookie_header) = {
            let state = self.state.read().await;
            match &state.url {
                Some(url) => (url.clone(), state.cookie_header.clone()),
                None => return Err(SurfaceError::Load("no page loaded".to_string())),
            }
        };

        let mut request = self.http.get(url).header(ACCEPT, "text/html");
        if !cookie_header.is_empty() {
            request = request.header(COOKIE, cookie_header);
        }
        match request.send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(html) => {
                    self.state.write().await.html = Some(html);
                    Ok(true)
                }
                Err(e) => {
                    tracing::debug!("page body read failed: {e}");
                    Ok(false)
                }
            },
            Ok(resp) => {
                tracing::debug!("page fetch returned {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                tracing::debug!("page fetch failed: {e}");
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl PageSurface for HttpPage {
    async fn load(&self, url: &str, cookies: &[Cookie]) -> Result<(), SurfaceError> {
        let url = Url::parse(url).map_err(|e| SurfaceError::Load(e.to_string()))?;
        {
            let mut state = self.state.write().await;
            *state = PageState {
                url: Some(url),
                cookie_header: cookie::cookie_header(cookies),
                html: None,
            };
        }
        // First attempt; failures here are retried by poll_ready
        let _ = self.try_fetch().await?;
        Ok(())
    }

    async fn poll_ready(&self) -> Result<bool, SurfaceError> {
        if self.state.read().await.html.is_some() {
            return Ok(true);
        }
        self.try_fetch().await
    }

    async fn reload(&self) -> Result<(), SurfaceError> {
        let _ = self.try_fetch().await?;
        Ok(())
    }

    async fn document_text(&self) -> Result<String, SurfaceError> {
        self.state
            .read()
            .await
            .html
            .clone()
            .ok_or_else(|| SurfaceError::Load("document not loaded".to_string()))
    }
}
