//! worker_fetch tool implementation.
//!
//! Runs one request through the worker as if a page had issued it.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use storyshell_client::{
    Destination, InterceptedRequest, RequestCategory, RequestMode, ResponseSource, ServiceWorker,
};
use storyshell_core::Error;

use super::json_result;

/// Input parameters for worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL of the request.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate", "same-origin", "no-cors" or "cors" (default).
    #[serde(default)]
    pub mode: Option<String>,

    /// Request destination: "document", "image", "script", "style", "font",
    /// "manifest", "other" or empty (default).
    #[serde(default)]
    pub destination: Option<String>,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for worker_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerFetchOutput {
    pub url: String,
    pub category: RequestCategory,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    /// Body as text; absent when the body is not UTF-8.
    pub body: Option<String>,
    pub body_len: usize,
    pub source: ResponseSource,
}

fn build_request(params: WorkerFetchParams) -> Result<InterceptedRequest, Error> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()));
    }

    let mut request = InterceptedRequest::parse(&params.url)?.with_method(&params.method)?;
    if let Some(mode) = params.mode.as_deref() {
        request = request.with_mode(mode.parse::<RequestMode>()?);
    }
    if let Some(destination) = params.destination.as_deref() {
        request = request.with_destination(destination.parse::<Destination>()?);
    }
    for (name, value) in &params.headers {
        request = request.with_header(name, value)?;
    }
    Ok(request)
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(params)?;
    let category = worker.classify(&request);
    let response = worker.on_intercept(&request).await;

    let output = WorkerFetchOutput {
        url: request.url.to_string(),
        category,
        status: response.status.as_u16(),
        status_text: response.status_text.clone(),
        headers: response
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect(),
        body: response.text().map(str::to_string),
        body_len: response.body.len(),
        source: response.source,
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::offline_worker;
    use crate::tools::result_json;
    use storyshell_core::{RequestKey, StoredResponse};

    fn params(url: &str) -> WorkerFetchParams {
        WorkerFetchParams {
            url: url.into(),
            method: default_method(),
            mode: None,
            destination: None,
            headers: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_offline_api_is_synthesized() {
        let (_db, worker) = offline_worker().await;

        let result = fetch_impl(&worker, params("https://story-api.dicoding.dev/v1/stories")).await.unwrap();
        let output = result_json(&result);
        assert_eq!(output["category"], "api");
        assert_eq!(output["status"], 503);
        assert_eq!(output["source"], "synthetic");
        let body: serde_json::Value = serde_json::from_str(output["body"].as_str().unwrap()).unwrap();
        assert_eq!(body["error"], true);
    }

    #[tokio::test]
    async fn test_cached_image_is_served() {
        let (db, worker) = offline_worker().await;
        let url = "https://cdn.example.com/photo.jpg";
        let stored = StoredResponse::new(
            200,
            "OK",
            vec![("content-type".into(), "image/jpeg".into())],
            b"jpeg".to_vec().into(),
        );
        db.partition(&worker.partitions().image).put(&RequestKey::get(url), &stored).await.unwrap();

        let mut p = params(url);
        p.destination = Some("image".into());
        let output = result_json(&fetch_impl(&worker, p).await.unwrap());
        assert_eq!(output["category"], "image");
        assert_eq!(output["status"], 200);
        assert_eq!(output["source"], "cache");
        assert_eq!(output["body"], "jpeg");
    }

    #[tokio::test]
    async fn test_navigation_offline_without_shell() {
        let (_db, worker) = offline_worker().await;
        let mut p = params("http://localhost:8080/");
        p.mode = Some("navigate".into());
        p.destination = Some("document".into());

        let output = result_json(&fetch_impl(&worker, p).await.unwrap());
        assert_eq!(output["category"], "navigation");
        assert_eq!(output["status"], 503);
    }

    #[tokio::test]
    async fn test_invalid_params() {
        let (_db, worker) = offline_worker().await;

        assert!(fetch_impl(&worker, params("")).await.is_err());
        assert!(fetch_impl(&worker, params("ftp://example.com/x")).await.is_err());

        let mut bad_mode = params("https://example.com/");
        bad_mode.mode = Some("teleport".into());
        let err = fetch_impl(&worker, bad_mode).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
