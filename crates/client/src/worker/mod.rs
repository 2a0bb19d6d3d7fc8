//! The request-interception worker.
//!
//! A [`ServiceWorker`] owns one partition-name table, one fetcher and one
//! seat in a shared [`Registration`]. Requests are classified by
//! [`selector::classify`] and served by the matching executor in
//! [`strategy`]; install and activate run through [`lifecycle`].

pub mod lifecycle;
pub mod selector;
pub mod strategy;

use std::sync::Arc;

use storyshell_core::{AppConfig, CacheDb, Error, PartitionNames};
use url::{Origin, Url};

pub use self::lifecycle::{
    ActivationReport, InstallReport, LifecycleController, LifecycleState, Registration, WorkerId,
};
pub use self::selector::{RequestCategory, classify};
pub use self::strategy::Strategies;

use crate::fetch::{Fetcher, resolve};
use crate::request::InterceptedRequest;
use crate::response::WorkerResponse;

/// Everything a worker version is parameterized by.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub api_origin: Url,
    pub shell_origin: Url,
    pub partitions: PartitionNames,
    /// Root-relative paths precached at install.
    pub shell_manifest: Vec<String>,
    pub offline_message: String,
    /// Largest body written to a partition.
    pub max_entry_bytes: usize,
}

impl WorkerConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let parse = |value: &str| Url::parse(value).map_err(|e| Error::InvalidUrl(format!("{value}: {e}")));
        Ok(Self {
            api_origin: parse(&config.api_origin)?,
            shell_origin: parse(&config.shell_origin)?,
            partitions: config.partition_names(),
            shell_manifest: config.shell_manifest.clone(),
            offline_message: config.offline_message.clone(),
            max_entry_bytes: config.max_bytes,
        })
    }

    /// Manifest entries resolved against the shell origin.
    pub fn manifest_urls(&self) -> Result<Vec<Url>, Error> {
        self.shell_manifest
            .iter()
            .map(|path| resolve(&self.shell_origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}"))))
            .collect()
    }
}

pub struct ServiceWorker {
    api_origin: Origin,
    shell_origin: Url,
    partitions: PartitionNames,
    lifecycle: LifecycleController,
    strategies: Strategies,
}

impl ServiceWorker {
    /// Parse a new worker version into the registration. It controls nothing
    /// until installed and activated.
    pub async fn new(
        config: WorkerConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>, registration: Registration,
    ) -> Result<Self, Error> {
        let manifest = config.manifest_urls()?;
        let id = registration.register_worker().await;

        let lifecycle = LifecycleController::new(
            id,
            db.clone(),
            fetcher.clone(),
            config.partitions.clone(),
            manifest,
            config.max_entry_bytes,
            registration,
        );
        let strategies = Strategies::new(
            db,
            fetcher,
            config.partitions.clone(),
            config.shell_origin.clone(),
            config.offline_message,
            config.max_entry_bytes,
        );

        tracing::debug!(worker = id, partitions = ?config.partitions.all(), "worker parsed");
        Ok(Self {
            api_origin: config.api_origin.origin(),
            shell_origin: config.shell_origin,
            partitions: config.partitions,
            lifecycle,
            strategies,
        })
    }

    pub fn id(&self) -> WorkerId {
        self.lifecycle.id()
    }

    pub fn partitions(&self) -> &PartitionNames {
        &self.partitions
    }

    /// Resolve a root-relative path against the shell origin.
    pub fn shell_url(&self, path: &str) -> Result<Url, Error> {
        resolve(&self.shell_origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }

    pub async fn state(&self) -> LifecycleState {
        self.lifecycle.state().await
    }

    pub async fn on_install(&self) -> Result<InstallReport, Error> {
        self.lifecycle.install().await
    }

    pub async fn on_activate(&self) -> Result<ActivationReport, Error> {
        self.lifecycle.activate().await
    }

    pub fn classify(&self, request: &InterceptedRequest) -> RequestCategory {
        classify(request, &self.api_origin)
    }

    /// Serve one request. Never fails: network and storage trouble turn into
    /// cached or synthetic responses.
    pub async fn on_intercept(&self, request: &InterceptedRequest) -> WorkerResponse {
        let category = self.classify(request);
        tracing::debug!(%request, ?category, "intercept");
        self.strategies.execute(category, request).await
    }
}
