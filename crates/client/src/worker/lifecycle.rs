//! Worker lifecycle: install, activate, supersede.
//!
//! ### State machine
//! ```text
//! Parsed -> Installing -> Installed -> Activating -> Active -> Superseded
//!               |
//!               +-> Redundant (install failed)
//! ```
//! Install may be retried from `Redundant`. A re-install while `Active`
//! refreshes the app shell without leaving `Active`. Once a newer worker is
//! active, an older one can neither install nor activate: it becomes
//! `Superseded` before touching any partition.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures_util::future::try_join_all;
use serde::Serialize;
use storyshell_core::{CacheDb, Error, PartitionNames, RequestKey, StoredResponse};
use tokio::sync::{Mutex, RwLock};
use url::Url;

use crate::fetch::Fetcher;
use crate::request::InterceptedRequest;

/// Identifies one worker instance within a registration.
pub type WorkerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Active,
    Superseded,
    Redundant,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Superseded => "superseded",
            Self::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Default)]
struct RegistrationInner {
    next_id: WorkerId,
    active: Option<WorkerId>,
    states: HashMap<WorkerId, LifecycleState>,
    clients: BTreeMap<String, Option<WorkerId>>,
}

/// Shared registration: which worker is active and which worker controls
/// each client page.
///
/// Cloning shares the same registration.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    inner: Arc<RwLock<RegistrationInner>>,
    // held for a whole activation, GC included
    activation: Arc<Mutex<()>>,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id for a freshly parsed worker.
    pub async fn register_worker(&self) -> WorkerId {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.states.insert(id, LifecycleState::Parsed);
        id
    }

    pub async fn state(&self, worker: WorkerId) -> Option<LifecycleState> {
        self.inner.read().await.states.get(&worker).copied()
    }

    pub(crate) async fn set_state(&self, worker: WorkerId, state: LifecycleState) {
        self.inner.write().await.states.insert(worker, state);
        tracing::debug!(worker, %state, "lifecycle transition");
    }

    pub async fn active_worker(&self) -> Option<WorkerId> {
        self.inner.read().await.active
    }

    /// The active worker, if it is newer than `worker`.
    pub(crate) async fn newer_active(&self, worker: WorkerId) -> Option<WorkerId> {
        self.active_worker().await.filter(|active| *active > worker)
    }

    /// Make `worker` the active one and supersede the previous active worker.
    /// Returns the superseded worker, if any.
    pub(crate) async fn activate(&self, worker: WorkerId) -> Option<WorkerId> {
        let mut inner = self.inner.write().await;
        let previous = inner.active.replace(worker).filter(|prev| *prev != worker);
        if let Some(prev) = previous {
            inner.states.insert(prev, LifecycleState::Superseded);
        }
        inner.states.insert(worker, LifecycleState::Active);
        previous
    }

    /// Point every client at `worker`. Returns how many changed controller.
    pub(crate) async fn claim(&self, worker: WorkerId) -> usize {
        let mut inner = self.inner.write().await;
        let mut claimed = 0;
        for controller in inner.clients.values_mut() {
            if *controller != Some(worker) {
                *controller = Some(worker);
                claimed += 1;
            }
        }
        claimed
    }

    /// Register a client page. New pages start under the active worker, if
    /// one exists.
    pub async fn add_client(&self, client: impl Into<String>) -> Option<WorkerId> {
        let mut inner = self.inner.write().await;
        let controller = inner.active;
        inner.clients.insert(client.into(), controller);
        controller
    }

    pub async fn remove_client(&self, client: &str) -> bool {
        self.inner.write().await.clients.remove(client).is_some()
    }

    /// Controller of a client page; `None` for unknown or uncontrolled pages.
    pub async fn controller(&self, client: &str) -> Option<WorkerId> {
        self.inner.read().await.clients.get(client).copied().flatten()
    }

    pub async fn clients(&self) -> Vec<(String, Option<WorkerId>)> {
        self.inner.read().await.clients.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}

/// Outcome of a successful install.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub partition: String,
    pub cached: usize,
}

/// Outcome of a successful activation.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationReport {
    /// Stale partitions removed.
    pub deleted: Vec<String>,
    /// Clients whose controller changed.
    pub claimed: usize,
    pub superseded: Option<WorkerId>,
}

/// Runs install and activate for one worker.
pub struct LifecycleController {
    id: WorkerId,
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    names: PartitionNames,
    manifest: Vec<Url>,
    max_entry_bytes: usize,
    registration: Registration,
}

impl LifecycleController {
    pub fn new(
        id: WorkerId, db: CacheDb, fetcher: Arc<dyn Fetcher>, names: PartitionNames, manifest: Vec<Url>,
        max_entry_bytes: usize, registration: Registration,
    ) -> Self {
        Self { id, db, fetcher, names, manifest, max_entry_bytes, registration }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub async fn state(&self) -> LifecycleState {
        self.registration.state(self.id).await.unwrap_or(LifecycleState::Parsed)
    }

    /// Precache the app-shell manifest. All or nothing: a single failed
    /// entry leaves the app-shell partition untouched.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let prior = self.state().await;
        if prior == LifecycleState::Superseded {
            return Err(Error::InvalidState(format!("worker {} is superseded", self.id)));
        }
        self.ensure_not_overtaken().await?;
        let was_active = prior == LifecycleState::Active;
        if !was_active {
            self.registration.set_state(self.id, LifecycleState::Installing).await;
        }

        match self.precache().await {
            Ok(report) => {
                if !was_active {
                    self.registration.set_state(self.id, LifecycleState::Installed).await;
                }
                tracing::info!(worker = self.id, partition = %report.partition, cached = report.cached, "install complete");
                Ok(report)
            }
            Err(err) => {
                if !was_active {
                    self.registration.set_state(self.id, LifecycleState::Redundant).await;
                }
                tracing::error!(worker = self.id, error = %err, "install failed");
                Err(err)
            }
        }
    }

    async fn precache(&self) -> Result<InstallReport, Error> {
        let fetches = self.manifest.iter().map(|url| async move {
            let request = InterceptedRequest::get(url.clone());
            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|e| Error::InstallFailed { url: url.to_string(), reason: e.to_string() })?;
            if !response.ok() {
                return Err(Error::InstallFailed {
                    url: url.to_string(),
                    reason: format!("status {}", response.status.as_u16()),
                });
            }
            response
                .check_entry_size(self.max_entry_bytes)
                .map_err(|e| Error::InstallFailed { url: url.to_string(), reason: e.to_string() })?;
            Ok::<(RequestKey, StoredResponse), Error>((request.key(), response.to_stored()))
        });

        let entries = try_join_all(fetches).await?;
        let cached = entries.len();
        self.db.partition(&self.names.app_shell).put_all(entries).await?;

        Ok(InstallReport { partition: self.names.app_shell.clone(), cached })
    }

    /// Drop stale partitions, take over the registration and claim clients.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let _activation = self.registration.activation.lock().await;

        let prior = self.state().await;
        if !matches!(prior, LifecycleState::Installed | LifecycleState::Active) {
            return Err(Error::InvalidState(format!("cannot activate worker {} from state {prior}", self.id)));
        }
        self.ensure_not_overtaken().await?;
        if prior == LifecycleState::Installed {
            self.registration.set_state(self.id, LifecycleState::Activating).await;
        }

        let deleted = match self.delete_stale().await {
            Ok(deleted) => deleted,
            Err(err) => {
                self.registration.set_state(self.id, prior).await;
                tracing::error!(worker = self.id, error = %err, "activation failed");
                return Err(err);
            }
        };

        let superseded = self.registration.activate(self.id).await;
        let claimed = self.registration.claim(self.id).await;

        tracing::info!(worker = self.id, deleted = deleted.len(), claimed, ?superseded, "activated");
        Ok(ActivationReport { deleted, claimed, superseded })
    }

    /// Supersede this worker if a newer one already controls the
    /// registration.
    async fn ensure_not_overtaken(&self) -> Result<(), Error> {
        let Some(newer) = self.registration.newer_active(self.id).await else {
            return Ok(());
        };
        self.registration.set_state(self.id, LifecycleState::Superseded).await;
        tracing::warn!(worker = self.id, newer, "newer worker already active");
        Err(Error::InvalidState(format!("worker {} was overtaken by active worker {newer}", self.id)))
    }

    async fn delete_stale(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.db.partition_names().await? {
            if self.names.contains(&name) {
                continue;
            }
            if self.db.delete_partition(&name).await? {
                tracing::debug!(partition = %name, "deleted stale partition");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }
}
