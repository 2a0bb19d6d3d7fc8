//! cache_clear tool implementation.
//!
//! Deletes one partition and all of its entries.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use storyshell_core::{CacheDb, Error};

use crate::tools::json_result;

/// Parameters for the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearParams {
    /// Name of the partition to delete.
    pub name: String,
}

/// Output from the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    pub name: String,
    /// False when no partition had that name.
    pub deleted: bool,
}

/// Implementation of the cache_clear tool.
pub async fn clear_impl(cache: &CacheDb, params: CacheClearParams) -> Result<CallToolResult, McpError> {
    if params.name.trim().is_empty() {
        return Err(Error::InvalidInput("partition name cannot be empty".into()).into());
    }

    let deleted = cache.delete_partition(&params.name).await?;
    tracing::info!(partition = %params.name, deleted, "cache partition cleared");

    json_result(&CacheClearOutput { name: params.name, deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::result_json;
    use storyshell_core::RequestKey;

    #[tokio::test]
    async fn test_clear_existing_partition() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        cache
            .partition("dstory-cache-v2")
            .put_json(&RequestKey::get("/api/stories-cache"), &serde_json::json!([1, 2]))
            .await
            .unwrap();

        let params = CacheClearParams { name: "dstory-cache-v2".into() };
        let result = clear_impl(&cache, params).await.unwrap();
        let output: CacheClearOutput = serde_json::from_value(result_json(&result)).unwrap();
        assert!(output.deleted);
        assert!(cache.partition_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_missing_partition() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let params = CacheClearParams { name: "nope".into() };
        let output = result_json(&clear_impl(&cache, params).await.unwrap());
        assert_eq!(output["deleted"], false);
    }

    #[tokio::test]
    async fn test_clear_empty_name() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let params = CacheClearParams { name: " ".into() };
        assert!(clear_impl(&cache, params).await.is_err());
    }
}
