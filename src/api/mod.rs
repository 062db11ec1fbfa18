//! HTTP client and interception pipeline.
//!
//! The client owns a transport and an ordered list of pre/post hooks
//! supplied at construction, so the pipeline's structure is visible and
//! testable without global wiring.

mod client;
mod hooks;
mod transport;
mod types;

pub use client::{ApiClient, RequestFlow, RequestHook, ResponseHook};
pub use hooks::{BearerAuthHook, OfflineHook};
pub use transport::{HttpTransport, Transport};
pub use types::{ApiRequest, ApiResponse};
