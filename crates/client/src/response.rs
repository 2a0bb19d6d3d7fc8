//! Responses handed back to the application.

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use storyshell_core::{Error, StoredResponse};

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    Synthetic,
}

/// A response returned from interception.
///
/// The body is a refcounted `Bytes`; cloning a response to store one copy
/// and return the other never consumes anything.
#[derive(Debug, Clone)]
pub struct WorkerResponse {
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl WorkerResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes, source: ResponseSource) -> Self {
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        Self { status, status_text, headers, body, source }
    }

    /// True for 2xx statuses: the only responses ever written to a partition.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body as UTF-8 text, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// The terminal API fallback: 503 with a JSON error body.
    pub fn offline_api(message: &str) -> Self {
        let body = serde_json::json!({ "error": true, "message": message }).to_string();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            status_text: "Service Unavailable".into(),
            headers,
            body: Bytes::from(body),
            source: ResponseSource::Synthetic,
        }
    }

    /// Empty-bodied 404 for images and static resources that could not be fetched.
    pub fn not_found(status_text: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            status_text: status_text.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            source: ResponseSource::Synthetic,
        }
    }

    /// Last-resort document when neither the network nor the shell can serve a
    /// navigation.
    pub fn offline_document() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            status_text: "Service Unavailable".into(),
            headers,
            body: Bytes::from_static(b"<!doctype html><title>Offline</title><p>You are offline.</p>"),
            source: ResponseSource::Synthetic,
        }
    }

    /// Rebuild a response from a partition entry. Header pairs that are no
    /// longer valid HTTP are dropped.
    pub fn from_stored(stored: StoredResponse) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in &stored.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::warn!(header = %name, "dropping invalid stored header"),
            }
        }

        let status = StatusCode::from_u16(stored.status).unwrap_or(StatusCode::OK);
        Self { status, status_text: stored.status_text, headers, body: stored.body, source: ResponseSource::Cache }
    }

    /// Reject bodies too large for a partition entry.
    pub fn check_entry_size(&self, limit: usize) -> Result<(), Error> {
        if self.body.len() > limit {
            return Err(Error::EntryTooLarge(format!("{} bytes exceeds {limit}", self.body.len())));
        }
        Ok(())
    }

    /// Snapshot for storage. Non-UTF-8 header values are skipped.
    pub fn to_stored(&self) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        StoredResponse::new(self.status.as_u16(), self.status_text.clone(), headers, self.body.clone())
    }
}
