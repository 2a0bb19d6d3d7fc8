//! cache_list tool implementation.
//!
//! Lists every partition with its entry count.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;
use storyshell_core::{CacheDb, PartitionNames};

use crate::tools::json_result;

#[derive(Debug, Clone, Serialize)]
pub struct PartitionSummary {
    pub name: String,
    pub entries: u64,
    /// Whether the running worker version owns this partition.
    pub current: bool,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheListOutput {
    pub partitions: Vec<PartitionSummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(cache: &CacheDb, names: &PartitionNames) -> Result<CallToolResult, McpError> {
    let partitions = cache
        .partition_infos()
        .await?
        .into_iter()
        .map(|info| PartitionSummary { current: names.contains(&info.name), name: info.name, entries: info.entries })
        .collect();

    json_result(&CacheListOutput { partitions })
}
