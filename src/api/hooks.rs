//! Interceptor hooks: offline cache serving and bearer auth.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{classify, keys, CacheDecision, KeyValueStore, OfflineCache};
use crate::reachability::ReachabilityMonitor;

use super::client::{RequestFlow, RequestHook, ResponseHook};
use super::types::{ApiRequest, ApiResponse};

/// Serves fresh cached responses while offline and opportunistically
/// caches successful responses on the way back.
///
/// When offline with no usable entry the request is still forwarded; the
/// transport's own connectivity failure reaches the caller unmodified
/// rather than a synthetic offline error.
pub struct OfflineHook {
  cache: OfflineCache,
  reachability: ReachabilityMonitor,
}

impl OfflineHook {
  pub fn new(cache: OfflineCache, reachability: ReachabilityMonitor) -> Self {
    Self {
      cache,
      reachability,
    }
  }
}

#[async_trait]
impl RequestHook for OfflineHook {
  async fn before_send(&self, request: &mut ApiRequest) -> RequestFlow {
    if self.reachability.is_online() {
      return RequestFlow::Continue;
    }

    let key = keys::api_response_key(&request.path);
    match self.cache.get(&key) {
      Ok(Some(value)) => {
        debug!(path = %request.path, "offline; serving response from cache");
        RequestFlow::ShortCircuit(ApiResponse::from_cache(value))
      }
      Ok(None) => RequestFlow::Continue,
      Err(e) => {
        // A broken store must not break the request path.
        warn!(path = %request.path, error = %e, "cache lookup failed; forwarding request");
        RequestFlow::Continue
      }
    }
  }
}

#[async_trait]
impl ResponseHook for OfflineHook {
  async fn after_receive(&self, request: &ApiRequest, response: &ApiResponse) {
    if response.served_from_cache {
      return;
    }
    if !response.is_success() {
      return;
    }

    let CacheDecision::Store { ttl } = classify(&request.path) else {
      return;
    };

    let key = keys::api_response_key(&request.path);
    match self.cache.put(&key, &response.body, ttl) {
      Ok(()) => {
        debug!(path = %request.path, ttl_secs = ttl.num_seconds(), "cached response")
      }
      Err(e) => warn!(path = %request.path, error = %e, "failed to cache response"),
    }
  }
}

/// Attaches the bearer token persisted by the auth flow.
///
/// Token refresh is someone else's job; this hook only reads whatever
/// token was last stored. Register it after [`OfflineHook`] so
/// short-circuited requests skip the token read.
pub struct BearerAuthHook {
  store: Arc<dyn KeyValueStore>,
}

impl BearerAuthHook {
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
    Self { store }
  }
}

#[async_trait]
impl RequestHook for BearerAuthHook {
  async fn before_send(&self, request: &mut ApiRequest) -> RequestFlow {
    match self.store.get(keys::AUTH_TOKEN_KEY) {
      Ok(Some(token)) => match HeaderValue::from_str(&format!("Bearer {}", token)) {
        Ok(value) => {
          request.headers.insert(AUTHORIZATION, value);
        }
        Err(e) => warn!(error = %e, "stored auth token is not a valid header value"),
      },
      Ok(None) => {}
      Err(e) => warn!(error = %e, "failed to read auth token; sending unauthenticated"),
    }

    RequestFlow::Continue
  }
}
