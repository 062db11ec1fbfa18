//! Offline-aware request cache and API client for the QuranicQuest
//! backend.
//!
//! The crate intercepts outbound API calls, serves previously stored
//! responses while offline, and opportunistically caches fresh responses
//! with content-specific expiration. UI layers consume
//! [`OfflineService`] and the [`api::ApiClient`] it wires up.

pub mod api;
pub mod cache;
pub mod config;
pub mod reachability;
pub mod service;

pub use config::Config;
pub use service::{DownloadOutcome, OfflineService};
