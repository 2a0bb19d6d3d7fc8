//! Scripted fetcher for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use storyshell_core::Error;

use super::Fetcher;
use crate::request::InterceptedRequest;
use crate::response::{ResponseSource, WorkerResponse};

#[derive(Clone)]
enum Route {
    Respond { status: StatusCode, content_type: &'static str, body: Bytes },
    Fail,
}

/// Serves canned responses by URL and counts every call.
///
/// Unknown URLs answer 404, like a reachable server would. `set_offline(true)`
/// makes every call fail with `NetworkUnavailable`.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<HashMap<String, usize>>,
    offline: AtomicBool,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, url: &str, status: u16, content_type: &'static str, body: &str) {
        let status = StatusCode::from_u16(status).unwrap();
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Route::Respond { status, content_type, body: Bytes::from(body.to_string()) },
        );
    }

    pub(crate) fn fail(&self, url: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), Route::Fail);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<WorkerResponse, Error> {
        let url = request.url.to_string();
        *self.calls.lock().unwrap().entry(url.clone()).or_default() += 1;

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::NetworkUnavailable(format!("offline: {url}")));
        }

        let route = self.routes.lock().unwrap().get(&url).cloned();
        match route {
            Some(Route::Respond { status, content_type, body }) => {
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
                Ok(WorkerResponse::new(status, headers, body, ResponseSource::Network))
            }
            Some(Route::Fail) => Err(Error::NetworkUnavailable(format!("connection reset: {url}"))),
            None => Ok(WorkerResponse::new(StatusCode::NOT_FOUND, HeaderMap::new(), Bytes::new(), ResponseSource::Network)),
        }
    }
}
