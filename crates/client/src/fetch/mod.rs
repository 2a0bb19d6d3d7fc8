//! The network side of the interception boundary.
//!
//! ### Contract
//! - `Ok` for every response a server produced, whatever its status.
//!   Upstream errors (4xx/5xx) are ordinary responses to the strategies.
//! - `Err` only when no response exists: offline, DNS failure, connection
//!   reset or timeout. Body size is not limited here; oversized bodies are
//!   served and simply not cached.
//!
//! ### URL Canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Lowercase host, remove fragments
//! - Preserve query string

#[cfg(test)]
pub(crate) mod mock;
pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;

pub use self::url::{UrlError, canonicalize, resolve};

use storyshell_core::Error;

use crate::request::InterceptedRequest;
use crate::response::{ResponseSource, WorkerResponse};

/// Anything that can put a request on the network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request. See the module docs for what counts as an error.
    async fn fetch(&self, request: &InterceptedRequest) -> Result<WorkerResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "storyshell/0.1")
    pub user_agent: String,

    /// Request timeout (default: none)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 20)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "storyshell/0.1".to_string(), timeout: None, max_redirects: 20 }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &storyshell_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed fetcher.
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn network_error(err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::NetworkUnavailable(format!("timed out: {err}"))
    } else {
        Error::NetworkUnavailable(err.to_string())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<WorkerResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| network_error(&e))?;

        let status = response.status();
        let headers = response.headers().clone();

        let body = response.bytes().await.map_err(|e| network_error(&e))?;

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes)",
            request,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(WorkerResponse::new(status, headers, body, ResponseSource::Network))
    }
}
