//! Cache partition MCP tools.
//!
//! This module provides tools for inspecting and clearing cache partitions.

pub mod clear;
pub mod delete_entry;
pub mod list;
pub mod lookup;

pub use clear::{CacheClearParams, clear_impl};
pub use delete_entry::{CacheDeleteEntryParams, delete_entry_impl};
pub use list::list_impl;
pub use lookup::{CacheMatchParams, match_impl};

use storyshell_client::{InterceptedRequest, ServiceWorker};
use storyshell_core::{Error, RequestKey};

fn default_method() -> String {
    "GET".into()
}

/// Key for a tool-supplied URL. Root-relative paths resolve against the
/// shell origin, the way a page's own requests do.
pub(crate) fn request_key(worker: &ServiceWorker, url: &str, method: &str) -> Result<RequestKey, Error> {
    let url = url.trim();
    if url.is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()));
    }

    let request = if url.starts_with('/') {
        InterceptedRequest::get(worker.shell_url(url)?)
    } else {
        InterceptedRequest::parse(url)?
    };
    Ok(request.with_method(method)?.key())
}
