//! Persistent response cache with per-entry expiration.
//!
//! This module provides the durable half of offline support:
//! - A key-value store abstraction with a SQLite implementation
//! - Cache entries carrying their write instant and TTL
//! - A pure policy classifying request paths into TTL classes
//! - Fixed key namespaces so invalidation can be scoped by prefix

pub mod keys;
mod policy;
mod service;
mod store;

pub use policy::{classify, default_ttl, learning_path_ttl, quran_content_ttl, CacheDecision};
pub use service::OfflineCache;
pub use store::{KeyValueStore, MemoryStore, SqliteStore, StoreError};
