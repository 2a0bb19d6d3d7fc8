//! Client side of storyshell.
//!
//! This crate provides the fetch boundary, the intercepted request/response
//! model and the worker that routes requests through cache strategies.

pub mod fetch;
pub mod request;
pub mod response;
pub mod worker;

pub use fetch::{FetchConfig, Fetcher, HttpFetcher};
pub use request::{Destination, InterceptedRequest, RequestMode};
pub use response::{ResponseSource, WorkerResponse};
pub use worker::{
    ActivationReport, InstallReport, LifecycleState, Registration, RequestCategory, ServiceWorker, WorkerConfig,
    WorkerId,
};
