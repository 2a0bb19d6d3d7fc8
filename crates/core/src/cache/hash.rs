//! Request identity used as the partition entry key.
//!
//! A key is the request method plus its absolute URL. Headers and bodies do
//! not participate, so two POSTs to one URL share an entry.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Normalized identity of a request inside a partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    /// Build a key. The method is uppercased; the URL is kept verbatim,
    /// querystring included.
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self { method: method.to_ascii_uppercase(), url: url.into() }
    }

    /// A GET key for the given absolute URL.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Storage hash of this key.
    pub fn hash(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Compute the storage hash for a method and absolute URL.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
