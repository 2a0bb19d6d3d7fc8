//! Shared fixtures for tool tests.

use std::sync::Arc;

use async_trait::async_trait;
use storyshell_client::{Fetcher, InterceptedRequest, Registration, ServiceWorker, WorkerConfig, WorkerResponse};
use storyshell_core::{AppConfig, CacheDb, Error};

/// A network that is never there.
pub(crate) struct OfflineFetcher;

#[async_trait]
impl Fetcher for OfflineFetcher {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<WorkerResponse, Error> {
        Err(Error::NetworkUnavailable(format!("offline: {request}")))
    }
}

/// Default-configured worker over an in-memory database, with no network.
pub(crate) async fn offline_worker() -> (CacheDb, Arc<ServiceWorker>) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let config = WorkerConfig::from_app_config(&AppConfig::default()).unwrap();
    let worker = ServiceWorker::new(config, db.clone(), Arc::new(OfflineFetcher), Registration::new())
        .await
        .unwrap();
    (db, Arc::new(worker))
}
