//! Network collaborator — issues the GET the button triggers.
//!
//! The controller only cares whether a request resolves or rejects; the
//! parsed body is handed back so the embedding application can keep it.

use futures_util::future::BoxFuture;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The request was abandoned through its cancellation token.
    #[error("request aborted")]
    Aborted,
    /// DNS, connect, non-2xx status or body parse failure.
    #[error("{0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

pub type FetchResult = Result<serde_json::Value, FetchError>;

/// Anything that can GET a URL and resolve with a parsed body.
///
/// Cancellation is driven from outside: the returned future is dropped when
/// the request is cancelled, so implementations must abort on drop (reqwest
/// futures do).
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, url: Url) -> BoxFuture<'static, FetchResult>;
}

/// reqwest-backed fetcher: GET, reject non-2xx, parse the body as JSON.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("fetch-button/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: Url) -> BoxFuture<'static, FetchResult> {
        let client = self.client.clone();
        Box::pin(async move {
            debug!("GET {}", url);
            let resp = client.get(url).send().await?.error_for_status()?;
            let status = resp.status();
            let body = resp.json::<serde_json::Value>().await?;
            debug!("response {} parsed", status);
            Ok(body)
        })
    }
}
