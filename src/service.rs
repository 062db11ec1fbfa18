//! Offline service facade: wiring, public cache surface and bootstrap.

use chrono::Duration;
use color_eyre::Result;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{
  ApiClient, BearerAuthHook, HttpTransport, OfflineHook, RequestHook, ResponseHook, Transport,
};
use crate::cache::{
  default_ttl, keys, learning_path_ttl, quran_content_ttl, KeyValueStore, OfflineCache,
  SqliteStore, StoreError,
};
use crate::config::Config;
use crate::reachability::{spawn_http_probe, ReachabilityMonitor, ReachabilityState};

/// Result of [`OfflineService::download_content_for_offline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
  pub success: bool,
  pub error: Option<String>,
}

impl DownloadOutcome {
  fn ok() -> Self {
    Self {
      success: true,
      error: None,
    }
  }

  fn failed(error: impl Into<String>) -> Self {
    Self {
      success: false,
      error: Some(error.into()),
    }
  }
}

/// Offline-aware API access for the rest of the app.
///
/// Explicitly constructed and handed to consumers; there is no ambient
/// global state. Owns the cache, the reachability monitor and the
/// intercepted HTTP client.
pub struct OfflineService {
  cache: OfflineCache,
  reachability: ReachabilityMonitor,
  client: ApiClient,
  probe: Option<JoinHandle<()>>,
}

impl OfflineService {
  /// Build a service with the default SQLite store and a background
  /// reachability probe. Must be called within a tokio runtime.
  ///
  /// Connectivity is assumed until the first probe reading lands.
  pub fn new(config: &Config) -> Result<Self> {
    let store: Arc<dyn KeyValueStore> = Arc::new(match &config.cache.dir {
      Some(dir) => SqliteStore::open(&dir.join("offline.db"))?,
      None => SqliteStore::open_default()?,
    });

    let mut service = Self::with_store(config, store)?;

    let probe_client = reqwest::Client::builder()
      .timeout(config.timeout())
      .build()
      .map_err(|e| color_eyre::eyre::eyre!("Failed to build probe client: {}", e))?;
    service.probe = Some(spawn_http_probe(
      service.reachability.clone(),
      probe_client,
      config.probe_url().to_string(),
      config.probe_interval(),
    ));

    Ok(service)
  }

  /// Build a service over an injected store, without a probe task. The
  /// host is expected to feed connectivity events through
  /// [`OfflineService::reachability`].
  pub fn with_store(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<Self> {
    let transport = Arc::new(HttpTransport::new(&config.api.url, config.timeout())?);
    let reachability = ReachabilityMonitor::new(ReachabilityState::online());

    Ok(Self::from_parts(store, reachability, transport))
  }

  /// Assemble a service from fully injected parts.
  pub fn from_parts(
    store: Arc<dyn KeyValueStore>,
    reachability: ReachabilityMonitor,
    transport: Arc<dyn Transport>,
  ) -> Self {
    let cache = OfflineCache::new(store.clone());
    let offline_hook = Arc::new(OfflineHook::new(cache.clone(), reachability.clone()));
    let auth_hook = Arc::new(BearerAuthHook::new(store));

    let request_hooks: Vec<Arc<dyn RequestHook>> = vec![offline_hook.clone(), auth_hook];
    let response_hooks: Vec<Arc<dyn ResponseHook>> = vec![offline_hook];
    let client = ApiClient::new(transport, request_hooks, response_hooks);

    Self {
      cache,
      reachability,
      client,
      probe: None,
    }
  }

  pub fn is_online(&self) -> bool {
    self.reachability.is_online()
  }

  pub fn client(&self) -> &ApiClient {
    &self.client
  }

  pub fn reachability(&self) -> &ReachabilityMonitor {
    &self.reachability
  }

  pub fn cache(&self) -> &OfflineCache {
    &self.cache
  }

  /// One-time installation bootstrap.
  ///
  /// Pre-populates baseline reference data while online and then sets the
  /// installation flag. Offline first runs defer seeding: the flag stays
  /// unset so a later online run completes it. Never fails app start.
  pub async fn initialize(&self) {
    match self.cache.is_initialized() {
      Ok(true) => {
        debug!("offline cache already initialized");
        return;
      }
      Ok(false) => {}
      Err(e) => warn!(error = %e, "could not read bootstrap flag; assuming first run"),
    }

    if !self.is_online() {
      info!("offline on first run; deferring cache pre-population");
      return;
    }

    if let Err(e) = self.pre_cache_essential_data().await {
      warn!(error = %e, "cache pre-population failed; will retry on next run");
      return;
    }

    match self.cache.mark_initialized() {
      Ok(()) => info!("offline cache initialized"),
      Err(e) => warn!(error = %e, "failed to persist bootstrap flag"),
    }
  }

  /// Fetch and cache the baseline reference resources.
  async fn pre_cache_essential_data(&self) -> Result<()> {
    let (surahs, plans) = futures::future::join(
      self.client.get("/api/quran/surahs"),
      self.client.get("/api/subscriptions/plans"),
    )
    .await;

    let surahs = surahs?;
    plans?;

    // The interceptor already cached both under their response keys; pin
    // the surah index under its well-known content key as well.
    self
      .cache
      .put(keys::SURAH_INDEX_KEY, &surahs.body, quran_content_ttl())?;

    Ok(())
  }

  /// Cache arbitrary data on behalf of the UI layer. `ttl` defaults to
  /// the 24-hour class.
  pub fn cache_custom_data(
    &self,
    key: &str,
    data: &Value,
    ttl: Option<Duration>,
  ) -> Result<(), StoreError> {
    self.cache.put(key, data, ttl.unwrap_or_else(default_ttl))
  }

  /// Read previously cached data. Missing, malformed and expired entries
  /// read as `None`.
  pub fn get_cached_data(&self, key: &str) -> Result<Option<Value>, StoreError> {
    self.cache.get(key)
  }

  /// Clear cached entries under a key prefix.
  pub fn clear_cache(&self, key_prefix: &str) -> Result<usize, StoreError> {
    self.cache.remove_prefix(key_prefix)
  }

  /// Clear every managed cache namespace (and re-arm bootstrap).
  pub fn clear_all_cache(&self) -> Result<usize, StoreError> {
    self.cache.clear_all()
  }

  /// Fetch one resource and pin it in the cache for offline use.
  ///
  /// Unsupported content types are reported in the outcome rather than
  /// thrown, and never touch the store.
  pub async fn download_content_for_offline(
    &self,
    content_type: &str,
    content_id: &str,
  ) -> DownloadOutcome {
    let (path, key, ttl) = match content_type {
      "surah" => (
        format!("/api/quran/surah/{}", content_id),
        keys::surah_key(content_id),
        quran_content_ttl(),
      ),
      "lesson" => (
        format!("/api/learning-paths/lesson/{}", content_id),
        keys::lesson_key(content_id),
        learning_path_ttl(),
      ),
      _ => return DownloadOutcome::failed("Unsupported content type"),
    };

    let response = match self.client.get(&path).await {
      Ok(response) => response,
      Err(e) => {
        warn!(content_type, content_id, error = %e, "offline download failed");
        return DownloadOutcome::failed(e.to_string());
      }
    };

    match self.cache.put(&key, &response.body, ttl) {
      Ok(()) => DownloadOutcome::ok(),
      Err(e) => {
        warn!(content_type, content_id, error = %e, "failed to store downloaded content");
        DownloadOutcome::failed(e.to_string())
      }
    }
  }

  /// Stop the background probe, if one is running.
  pub fn shutdown(&mut self) {
    if let Some(probe) = self.probe.take() {
      probe.abort();
    }
  }
}

impl Drop for OfflineService {
  fn drop(&mut self) {
    self.shutdown();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{ApiRequest, ApiResponse};
  use crate::cache::MemoryStore;
  use async_trait::async_trait;
  use color_eyre::eyre::eyre;
  use serde_json::json;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct FakeTransport {
    calls: AtomicUsize,
    online: ReachabilityMonitor,
  }

  impl FakeTransport {
    fn new(online: ReachabilityMonitor) -> Self {
      Self {
        calls: AtomicUsize::new(0),
        online,
      }
    }

    fn call_count(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }
  }

  #[async_trait]
  impl Transport for FakeTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      if !self.online.is_online() {
        return Err(eyre!("Request to {} failed: connect ECONNREFUSED", request.path));
      }
      let body = match request.path.as_str() {
        "/api/quran/surahs" => json!({"surahs": [{"id": 1}]}),
        "/api/subscriptions/plans" => json!({"plans": []}),
        path if path.starts_with("/api/quran/surah/") => json!({"verses": ["..."]}),
        path if path.starts_with("/api/learning-paths/lesson/") => json!({"units": [1, 2]}),
        _ => json!({}),
      };
      Ok(ApiResponse::from_network(200, body))
    }
  }

  struct Rig {
    service: OfflineService,
    transport: Arc<FakeTransport>,
    monitor: ReachabilityMonitor,
  }

  fn rig() -> Rig {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let monitor = ReachabilityMonitor::new(ReachabilityState::online());
    let transport = Arc::new(FakeTransport::new(monitor.clone()));
    let service = OfflineService::from_parts(store, monitor.clone(), transport.clone());

    Rig {
      service,
      transport,
      monitor,
    }
  }

  #[tokio::test]
  async fn test_initialize_seeds_cache_and_sets_flag() {
    let rig = rig();

    rig.service.initialize().await;

    assert!(rig.service.cache().is_initialized().unwrap());
    assert_eq!(
      rig.service.get_cached_data(keys::SURAH_INDEX_KEY).unwrap(),
      Some(json!({"surahs": [{"id": 1}]}))
    );
  }

  #[tokio::test]
  async fn test_initialize_is_one_time() {
    let rig = rig();

    rig.service.initialize().await;
    let calls_after_first = rig.transport.call_count();
    rig.service.initialize().await;

    assert_eq!(rig.transport.call_count(), calls_after_first);
  }

  #[tokio::test]
  async fn test_offline_first_run_defers_seeding() {
    let rig = rig();
    rig.monitor.update(ReachabilityState::offline());

    rig.service.initialize().await;

    // Flag stays unset so a later online run can still seed.
    assert!(!rig.service.cache().is_initialized().unwrap());
    assert_eq!(rig.transport.call_count(), 0);

    rig.monitor.update(ReachabilityState::online());
    rig.service.initialize().await;

    assert!(rig.service.cache().is_initialized().unwrap());
    assert!(rig.service.get_cached_data(keys::SURAH_INDEX_KEY).unwrap().is_some());
  }

  #[tokio::test]
  async fn test_failed_seeding_leaves_flag_unset() {
    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
      async fn execute(&self, _request: &ApiRequest) -> Result<ApiResponse> {
        Err(eyre!("server error"))
      }
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let monitor = ReachabilityMonitor::new(ReachabilityState::online());
    let service = OfflineService::from_parts(store, monitor, Arc::new(FailingTransport));

    service.initialize().await;

    assert!(!service.cache().is_initialized().unwrap());
  }

  #[tokio::test]
  async fn test_download_lesson_survives_going_offline() {
    // Download while online, read back after going offline.
    let rig = rig();

    let outcome = rig.service.download_content_for_offline("lesson", "L1").await;
    assert_eq!(outcome, DownloadOutcome::ok());

    rig.monitor.update(ReachabilityState::offline());

    assert_eq!(
      rig.service.get_cached_data(&keys::lesson_key("L1")).unwrap(),
      Some(json!({"units": [1, 2]}))
    );
  }

  #[tokio::test]
  async fn test_download_surah_pins_content_key() {
    let rig = rig();

    let outcome = rig.service.download_content_for_offline("surah", "1").await;

    assert_eq!(outcome, DownloadOutcome::ok());
    assert_eq!(
      rig.service.get_cached_data(&keys::surah_key("1")).unwrap(),
      Some(json!({"verses": ["..."]}))
    );
  }

  #[tokio::test]
  async fn test_download_unsupported_type_reports_without_store_access() {
    let rig = rig();

    let outcome = rig.service.download_content_for_offline("unknown", "X").await;

    assert_eq!(
      outcome,
      DownloadOutcome::failed("Unsupported content type")
    );
    assert_eq!(rig.transport.call_count(), 0);
    assert_eq!(rig.service.cache().managed_entry_count().unwrap(), 0);
  }

  #[tokio::test]
  async fn test_download_failure_reports_the_network_error() {
    let rig = rig();
    rig.monitor.update(ReachabilityState::offline());

    let outcome = rig.service.download_content_for_offline("lesson", "L1").await;

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("ECONNREFUSED"));
  }

  #[tokio::test]
  async fn test_custom_data_roundtrip_with_default_ttl() {
    let rig = rig();

    rig
      .service
      .cache_custom_data("user_data_settings", &json!({"theme": "dark"}), None)
      .unwrap();

    assert_eq!(
      rig.service.get_cached_data("user_data_settings").unwrap(),
      Some(json!({"theme": "dark"}))
    );
  }

  #[tokio::test]
  async fn test_clear_all_cache_rearms_bootstrap() {
    let rig = rig();

    rig.service.initialize().await;
    assert!(rig.service.cache().is_initialized().unwrap());

    rig.service.clear_all_cache().unwrap();

    assert!(!rig.service.cache().is_initialized().unwrap());
    assert_eq!(rig.service.cache().managed_entry_count().unwrap(), 0);
  }

  #[tokio::test]
  async fn test_is_online_tracks_the_monitor() {
    let rig = rig();

    assert!(rig.service.is_online());
    rig.monitor.update(ReachabilityState::offline());
    assert!(!rig.service.is_online());
  }
}
