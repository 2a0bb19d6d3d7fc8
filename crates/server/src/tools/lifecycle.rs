//! worker_install and worker_activate tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;
use storyshell_client::{ActivationReport, InstallReport, LifecycleState, ServiceWorker, WorkerId};

use super::json_result;

#[derive(Debug, Clone, Serialize)]
pub struct WorkerInstallOutput {
    pub worker: WorkerId,
    pub state: LifecycleState,
    #[serde(flatten)]
    pub report: InstallReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerActivateOutput {
    pub worker: WorkerId,
    pub state: LifecycleState,
    #[serde(flatten)]
    pub report: ActivationReport,
}

/// Implementation of the worker_install tool.
pub async fn install_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.on_install().await?;
    json_result(&WorkerInstallOutput { worker: worker.id(), state: worker.state().await, report })
}

/// Implementation of the worker_activate tool.
pub async fn activate_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.on_activate().await?;
    json_result(&WorkerActivateOutput { worker: worker.id(), state: worker.state().await, report })
}
