//! Strategy executors.
//!
//! Each executor takes one request and always yields one response: live,
//! cached, or synthesized. Only 2xx responses to GET requests, no larger than
//! the entry limit, are written to a partition, and only GET requests are
//! served from one. Storage trouble on this path degrades to a cache miss.

use std::sync::Arc;

use storyshell_core::{CacheDb, PartitionNames, RequestKey};
use url::Url;

use super::selector::RequestCategory;
use crate::fetch::{Fetcher, resolve};
use crate::request::InterceptedRequest;
use crate::response::WorkerResponse;

/// Shell page served when a navigation cannot reach the network.
pub const OFFLINE_PAGE: &str = "/offline.html";

/// Second choice when the offline page was never cached.
pub const INDEX_PAGE: &str = "/index.html";

/// The four executors plus what they share.
pub struct Strategies {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    names: PartitionNames,
    shell_origin: Url,
    offline_message: String,
    max_entry_bytes: usize,
}

impl Strategies {
    pub fn new(
        db: CacheDb, fetcher: Arc<dyn Fetcher>, names: PartitionNames, shell_origin: Url, offline_message: String,
        max_entry_bytes: usize,
    ) -> Self {
        Self { db, fetcher, names, shell_origin, offline_message, max_entry_bytes }
    }

    /// Run the executor for a category.
    pub async fn execute(&self, category: RequestCategory, request: &InterceptedRequest) -> WorkerResponse {
        match category {
            RequestCategory::Api => self.network_first(request).await,
            RequestCategory::Image => self.cache_first(request).await,
            RequestCategory::Navigation => self.navigation_fallback(request).await,
            RequestCategory::Resource => self.pass_through(request).await,
        }
    }

    /// API: network, then the api partition, then a synthetic 503.
    pub async fn network_first(&self, request: &InterceptedRequest) -> WorkerResponse {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store(&self.names.api, request, &response).await;
                response
            }
            Err(err) => {
                tracing::debug!(%request, error = %err, "network failed, trying cache");
                if let Some(cached) = self.cached(&self.names.api, request).await {
                    return cached;
                }
                tracing::warn!(%request, "offline with no cached API response");
                WorkerResponse::offline_api(&self.offline_message)
            }
        }
    }

    /// Images: a cached image is served without touching the network.
    pub async fn cache_first(&self, request: &InterceptedRequest) -> WorkerResponse {
        self.cached_or_fetch(&self.names.image, request, "Image not found").await
    }

    /// Documents: network first, then the shell's offline page, then its index.
    pub async fn navigation_fallback(&self, request: &InterceptedRequest) -> WorkerResponse {
        match self.fetcher.fetch(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(%request, error = %err, "navigation failed, serving offline page");
                for page in [OFFLINE_PAGE, INDEX_PAGE] {
                    let Ok(url) = resolve(&self.shell_origin, page) else {
                        continue;
                    };
                    if let Some(cached) = self.lookup(&self.names.app_shell, &RequestKey::get(url.as_str())).await {
                        return cached;
                    }
                }
                tracing::warn!(%request, "app shell has neither offline nor index page");
                WorkerResponse::offline_document()
            }
        }
    }

    /// Static resources: cache-first against the app-shell partition.
    pub async fn pass_through(&self, request: &InterceptedRequest) -> WorkerResponse {
        self.cached_or_fetch(&self.names.app_shell, request, "Resource not found").await
    }

    async fn cached_or_fetch(&self, partition: &str, request: &InterceptedRequest, not_found: &str) -> WorkerResponse {
        if let Some(cached) = self.cached(partition, request).await {
            tracing::debug!(%request, partition, "cache hit");
            return cached;
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store(partition, request, &response).await;
                response
            }
            Err(err) => {
                tracing::debug!(%request, error = %err, "request failed with nothing cached");
                WorkerResponse::not_found(not_found)
            }
        }
    }

    async fn lookup(&self, partition: &str, key: &RequestKey) -> Option<WorkerResponse> {
        match self.db.partition(partition).lookup(key).await {
            Ok(found) => found.map(WorkerResponse::from_stored),
            Err(err) => {
                tracing::warn!(partition, %key, error = %err, "cache read failed, treating as miss");
                None
            }
        }
    }

    async fn cached(&self, partition: &str, request: &InterceptedRequest) -> Option<WorkerResponse> {
        if !request.is_cacheable() {
            return None;
        }
        self.lookup(partition, &request.key()).await
    }

    async fn store(&self, partition: &str, request: &InterceptedRequest, response: &WorkerResponse) {
        if !response.ok() || !request.is_cacheable() {
            return;
        }
        if let Err(err) = response.check_entry_size(self.max_entry_bytes) {
            tracing::debug!(%request, error = %err, "serving without caching");
            return;
        }

        let key = request.key();
        if let Err(err) = self.db.partition(partition).put(&key, &response.to_stored()).await {
            tracing::warn!(partition, %key, error = %err, "cache write failed");
        }
    }
}
