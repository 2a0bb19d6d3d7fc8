//! cache_delete_entry tool implementation.
//!
//! Invalidates a single entry in one partition.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use storyshell_client::ServiceWorker;
use storyshell_core::{CacheDb, Error};

use super::{default_method, request_key};
use crate::tools::json_result;

/// Parameters for the cache_delete_entry tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteEntryParams {
    /// Partition holding the entry.
    pub partition: String,

    /// Absolute URL, or a path relative to the shell origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,
}

/// Output from the cache_delete_entry tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheDeleteEntryOutput {
    pub partition: String,
    pub url: String,
    pub deleted: bool,
}

/// Implementation of the cache_delete_entry tool.
pub async fn delete_entry_impl(
    cache: &CacheDb, worker: &ServiceWorker, params: CacheDeleteEntryParams,
) -> Result<CallToolResult, McpError> {
    if params.partition.trim().is_empty() {
        return Err(Error::InvalidInput("partition name cannot be empty".into()).into());
    }

    let key = request_key(worker, &params.url, &params.method)?;
    let deleted = cache.partition(&params.partition).delete_entry(&key).await?;
    tracing::debug!(partition = %params.partition, %key, deleted, "cache entry deleted");

    json_result(&CacheDeleteEntryOutput { partition: params.partition, url: key.url, deleted })
}
