//! Stored response representation.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Header stamped on programmatically cached JSON documents.
pub const CACHED_AT_HEADER: &str = "X-Cached-At";

/// An immutable response held in a partition.
///
/// The body is a refcounted buffer: cloning a `StoredResponse` to both store
/// it and hand it back to a caller never re-reads or consumes anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub stored_at: DateTime<Utc>,
}

impl StoredResponse {
    pub fn new(status: u16, status_text: impl Into<String>, headers: Vec<(String, String)>, body: Bytes) -> Self {
        Self { status, status_text: status_text.into(), headers, body, stored_at: Utc::now() }
    }

    /// Build a 200 JSON document carrying an `X-Cached-At` capture stamp.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        let now = Utc::now();
        Ok(Self {
            status: 200,
            status_text: "OK".into(),
            headers: vec![
                ("Content-Type".into(), "application/json".into()),
                (CACHED_AT_HEADER.into(), now.to_rfc3339()),
            ],
            body: Bytes::from(body),
            stored_at: now,
        })
    }

    /// Case-insensitive header lookup, first value wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// True for 2xx statuses.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Capture time from the `X-Cached-At` header, if present and parseable.
    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        self.header(CACHED_AT_HEADER)
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = StoredResponse::new(
            200,
            "OK",
            vec![("content-type".into(), "image/png".into())],
            Bytes::from_static(b"png"),
        );
        assert_eq!(response.header("Content-Type"), Some("image/png"));
        assert_eq!(response.header("etag"), None);
    }

    #[test]
    fn test_json_stamps_capture_time() {
        let response = StoredResponse::json(&serde_json::json!({ "listStory": [] })).unwrap();
        assert!(response.is_ok());
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert!(response.cached_at().is_some());
    }

    #[test]
    fn test_clone_shares_body() {
        let response = StoredResponse::new(200, "OK", Vec::new(), Bytes::from(vec![1u8, 2, 3]));
        let copy = response.clone();
        assert_eq!(copy.body.as_ptr(), response.body.as_ptr());
        assert_eq!(copy, response);
    }

    #[test]
    fn test_is_ok_range() {
        assert!(StoredResponse::new(204, "No Content", Vec::new(), Bytes::new()).is_ok());
        assert!(!StoredResponse::new(304, "Not Modified", Vec::new(), Bytes::new()).is_ok());
    }
}
