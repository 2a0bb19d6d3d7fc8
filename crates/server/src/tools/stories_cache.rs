//! stories_cache_put and stories_cache_get tool implementations.
//!
//! Caches a JSON document in the API partition under a fixed shell path,
//! stamped with `X-Cached-At`, so the story list survives going offline.

use chrono::{DateTime, Utc};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use storyshell_client::ServiceWorker;
use storyshell_core::{CacheDb, RequestKey};

use super::json_result;

/// Shell path the stories document is cached under.
pub const STORIES_CACHE_PATH: &str = "/api/stories-cache";

/// Parameters for the stories_cache_put tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoriesCachePutParams {
    /// Any JSON document, usually a story list response.
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoriesCachePutOutput {
    pub partition: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoriesCacheGetOutput {
    pub found: bool,
    pub data: Option<serde_json::Value>,
    pub cached_at: Option<DateTime<Utc>>,
}

fn stories_key(worker: &ServiceWorker) -> Result<RequestKey, McpError> {
    Ok(RequestKey::get(worker.shell_url(STORIES_CACHE_PATH)?.as_str()))
}

/// Implementation of the stories_cache_put tool.
pub async fn put_impl(
    cache: &CacheDb, worker: &ServiceWorker, params: StoriesCachePutParams,
) -> Result<CallToolResult, McpError> {
    let key = stories_key(worker)?;
    let partition = cache.open_partition(&worker.partitions().api).await?;
    partition.put_json(&key, &params.data).await?;

    json_result(&StoriesCachePutOutput { partition: partition.name().to_string(), url: key.url })
}

/// Implementation of the stories_cache_get tool. An empty cache is not an
/// error: `found` is false.
pub async fn get_impl(cache: &CacheDb, worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let key = stories_key(worker)?;
    let cached = cache
        .partition(&worker.partitions().api)
        .get_json::<serde_json::Value>(&key)
        .await?;

    let output = match cached {
        Some((data, cached_at)) => StoriesCacheGetOutput { found: true, data: Some(data), cached_at: Some(cached_at) },
        None => StoriesCacheGetOutput { found: false, data: None, cached_at: None },
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::offline_worker;
    use crate::tools::result_json;

    #[tokio::test]
    async fn test_put_then_get() {
        let (db, worker) = offline_worker().await;
        let data = serde_json::json!({ "error": false, "listStory": [{ "id": "story-1" }] });

        let put: StoriesCachePutOutput = serde_json::from_value(result_json(
            &put_impl(&db, &worker, StoriesCachePutParams { data: data.clone() }).await.unwrap(),
        ))
        .unwrap();
        assert_eq!(put.partition, "dstory-api-cache-v2");
        assert_eq!(put.url, "http://localhost:8080/api/stories-cache");

        let got: StoriesCacheGetOutput = serde_json::from_value(result_json(&get_impl(&db, &worker).await.unwrap())).unwrap();
        assert!(got.found);
        assert_eq!(got.data, Some(data));
        assert!(got.cached_at.is_some());
    }

    #[tokio::test]
    async fn test_get_empty() {
        let (db, worker) = offline_worker().await;
        let got = result_json(&get_impl(&db, &worker).await.unwrap());
        assert_eq!(got["found"], false);
        assert!(got["data"].is_null());
    }
}
