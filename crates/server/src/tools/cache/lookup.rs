//! cache_match tool implementation.
//!
//! Reads one stored response, from a named partition or from whichever
//! partition holds it first.

use chrono::{DateTime, Utc};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use storyshell_client::ServiceWorker;
use storyshell_core::{CacheDb, Error};

use super::{default_method, request_key};
use crate::tools::json_result;

/// Parameters for the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchParams {
    /// Absolute URL, or a path relative to the shell origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Partition to search. When absent, every partition is searched and the
    /// oldest one holding the entry wins.
    #[serde(default)]
    pub partition: Option<String>,
}

/// Output from the cache_match tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheMatchOutput {
    pub url: String,
    pub method: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    /// Body as text; absent when the body is not UTF-8.
    pub body: Option<String>,
    pub stored_at: DateTime<Utc>,
    /// `X-Cached-At` stamp, for programmatically cached documents.
    pub cached_at: Option<DateTime<Utc>>,
}

/// Implementation of the cache_match tool.
pub async fn match_impl(
    cache: &CacheDb, worker: &ServiceWorker, params: CacheMatchParams,
) -> Result<CallToolResult, McpError> {
    let key = request_key(worker, &params.url, &params.method)?;

    let found = match params.partition.as_deref() {
        Some(name) => cache.partition(name).lookup(&key).await?,
        None => cache.match_any(&key).await?,
    };
    let stored = found.ok_or_else(|| Error::CacheMiss(key.to_string()))?;

    let output = CacheMatchOutput {
        url: key.url,
        method: key.method,
        status: stored.status,
        body: std::str::from_utf8(&stored.body).ok().map(str::to_string),
        cached_at: stored.cached_at(),
        status_text: stored.status_text,
        headers: stored.headers,
        stored_at: stored.stored_at,
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::offline_worker;
    use crate::tools::result_json;
    use storyshell_core::{RequestKey, StoredResponse};

    fn params(url: &str, partition: Option<&str>) -> CacheMatchParams {
        CacheMatchParams { url: url.into(), method: default_method(), partition: partition.map(String::from) }
    }

    #[tokio::test]
    async fn test_match_any_and_scoped() {
        let (db, worker) = offline_worker().await;
        let url = "https://cdn.example.com/a.png";
        let stored = StoredResponse::new(200, "OK", vec![("content-type".into(), "image/png".into())], "png".into());
        db.partition("dstory-image-cache-v2").put(&RequestKey::get(url), &stored).await.unwrap();

        let output = result_json(&match_impl(&db, &worker, params(url, None)).await.unwrap());
        assert_eq!(output["status"], 200);
        assert_eq!(output["body"], "png");
        assert!(output["cached_at"].is_null());

        let scoped = match_impl(&db, &worker, params(url, Some("dstory-api-cache-v2"))).await;
        assert_eq!(scoped.unwrap_err().code.0, -32001);
    }

    #[tokio::test]
    async fn test_match_root_relative_path() {
        let (db, worker) = offline_worker().await;
        let key = RequestKey::get("http://localhost:8080/api/stories-cache");
        db.partition("dstory-api-cache-v2")
            .put_json(&key, &serde_json::json!({ "listStory": [] }))
            .await
            .unwrap();

        let output = result_json(&match_impl(&db, &worker, params("/api/stories-cache", None)).await.unwrap());
        assert_eq!(output["url"], "http://localhost:8080/api/stories-cache");
        assert!(output["cached_at"].is_string());
    }

    #[tokio::test]
    async fn test_match_missing() {
        let (db, worker) = offline_worker().await;
        let err = match_impl(&db, &worker, params("https://example.com/", None)).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }
}
