//! Request classification.

use serde::Serialize;
use url::Origin;

use crate::request::{Destination, InterceptedRequest, RequestMode};

/// Which strategy serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestCategory {
    /// API origin: network-first.
    Api,
    /// Images: cache-first.
    Image,
    /// Top-level documents: network with shell fallback.
    Navigation,
    /// Scripts, styles, fonts and everything else: cache-first in the shell.
    Resource,
}

/// Classify a request. Total and side-effect free.
///
/// The API origin check runs first so API responses are never treated as
/// static assets, whatever their destination.
pub fn classify(request: &InterceptedRequest, api_origin: &Origin) -> RequestCategory {
    if request.url.origin() == *api_origin {
        RequestCategory::Api
    } else if request.destination == Destination::Image {
        RequestCategory::Image
    } else if request.mode == RequestMode::Navigate {
        RequestCategory::Navigation
    } else {
        RequestCategory::Resource
    }
}
