//! API client with a hook-based interception pipeline.

use async_trait::async_trait;
use color_eyre::Result;
use serde_json::Value;
use std::sync::Arc;

use super::transport::Transport;
use super::types::{ApiRequest, ApiResponse};

/// Outcome of a pre-flight hook.
pub enum RequestFlow {
  /// Proceed to the next hook and then the network.
  Continue,
  /// Skip the network and deliver this response instead.
  ShortCircuit(ApiResponse),
}

/// Pre-flight interception point. Hooks may rewrite the request (headers,
/// body) or short-circuit it entirely.
#[async_trait]
pub trait RequestHook: Send + Sync {
  async fn before_send(&self, request: &mut ApiRequest) -> RequestFlow;
}

/// Post-flight interception point. Runs for every delivered response,
/// including short-circuited ones; implementations check the
/// `served_from_cache` marker and must never fail the request.
#[async_trait]
pub trait ResponseHook: Send + Sync {
  async fn after_receive(&self, request: &ApiRequest, response: &ApiResponse);
}

/// HTTP client with an ordered hook pipeline fixed at construction.
///
/// Within one request the order is: every request hook, then the
/// transport (unless a hook short-circuited), then every response hook.
/// Nothing is guaranteed across concurrent requests.
#[derive(Clone)]
pub struct ApiClient {
  transport: Arc<dyn Transport>,
  request_hooks: Vec<Arc<dyn RequestHook>>,
  response_hooks: Vec<Arc<dyn ResponseHook>>,
}

impl ApiClient {
  pub fn new(
    transport: Arc<dyn Transport>,
    request_hooks: Vec<Arc<dyn RequestHook>>,
    response_hooks: Vec<Arc<dyn ResponseHook>>,
  ) -> Self {
    Self {
      transport,
      request_hooks,
      response_hooks,
    }
  }

  /// Run `request` through the pipeline.
  ///
  /// Transport errors propagate verbatim; response hooks only run for
  /// delivered responses.
  pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
    for hook in &self.request_hooks {
      if let RequestFlow::ShortCircuit(response) = hook.before_send(&mut request).await {
        return Ok(self.deliver(&request, response).await);
      }
    }

    let response = self.transport.execute(&request).await?;

    Ok(self.deliver(&request, response).await)
  }

  async fn deliver(&self, request: &ApiRequest, response: ApiResponse) -> ApiResponse {
    for hook in &self.response_hooks {
      hook.after_receive(request, &response).await;
    }
    response
  }

  pub async fn get(&self, path: &str) -> Result<ApiResponse> {
    self.send(ApiRequest::get(path)).await
  }

  pub async fn post(&self, path: &str, body: Value) -> Result<ApiResponse> {
    self.send(ApiRequest::post(path, body)).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use color_eyre::eyre::eyre;
  use serde_json::json;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;

  struct FakeTransport {
    calls: AtomicUsize,
    response: Value,
    fail_with: Option<String>,
  }

  impl FakeTransport {
    fn responding(response: Value) -> Self {
      Self {
        calls: AtomicUsize::new(0),
        response,
        fail_with: None,
      }
    }

    fn failing(message: &str) -> Self {
      Self {
        calls: AtomicUsize::new(0),
        response: Value::Null,
        fail_with: Some(message.to_string()),
      }
    }

    fn call_count(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }
  }

  #[async_trait]
  impl Transport for FakeTransport {
    async fn execute(&self, _request: &ApiRequest) -> Result<ApiResponse> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      match &self.fail_with {
        Some(message) => Err(eyre!("{}", message)),
        None => Ok(ApiResponse::from_network(200, self.response.clone())),
      }
    }
  }

  struct ShortCircuitHook;

  #[async_trait]
  impl RequestHook for ShortCircuitHook {
    async fn before_send(&self, _request: &mut ApiRequest) -> RequestFlow {
      RequestFlow::ShortCircuit(ApiResponse::from_cache(json!("cached")))
    }
  }

  struct RecordingResponseHook {
    seen: Mutex<Vec<bool>>,
  }

  #[async_trait]
  impl ResponseHook for RecordingResponseHook {
    async fn after_receive(&self, _request: &ApiRequest, response: &ApiResponse) {
      self.seen.lock().unwrap().push(response.served_from_cache);
    }
  }

  struct TaggingHook {
    tag: &'static str,
  }

  #[async_trait]
  impl RequestHook for TaggingHook {
    async fn before_send(&self, request: &mut ApiRequest) -> RequestFlow {
      request.path.push_str(self.tag);
      RequestFlow::Continue
    }
  }

  struct PathCapturingTransport {
    paths: Mutex<Vec<String>>,
  }

  #[async_trait]
  impl Transport for PathCapturingTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
      self.paths.lock().unwrap().push(request.path.clone());
      Ok(ApiResponse::from_network(200, Value::Null))
    }
  }

  #[tokio::test]
  async fn test_send_forwards_to_transport() {
    let transport = Arc::new(FakeTransport::responding(json!({"ok": true})));
    let client = ApiClient::new(transport.clone(), vec![], vec![]);

    let response = client.get("/api/quran/surahs").await.unwrap();

    assert_eq!(transport.call_count(), 1);
    assert_eq!(response.body, json!({"ok": true}));
    assert!(!response.served_from_cache);
  }

  #[tokio::test]
  async fn test_short_circuit_skips_transport() {
    let transport = Arc::new(FakeTransport::responding(Value::Null));
    let client = ApiClient::new(transport.clone(), vec![Arc::new(ShortCircuitHook)], vec![]);

    let response = client.get("/api/quran/surahs").await.unwrap();

    assert_eq!(transport.call_count(), 0);
    assert!(response.served_from_cache);
    assert_eq!(response.body, json!("cached"));
  }

  #[tokio::test]
  async fn test_response_hooks_see_the_cache_marker() {
    let hook = Arc::new(RecordingResponseHook {
      seen: Mutex::new(Vec::new()),
    });
    let client = ApiClient::new(
      Arc::new(FakeTransport::responding(Value::Null)),
      vec![Arc::new(ShortCircuitHook)],
      vec![hook.clone()],
    );

    client.get("/anything").await.unwrap();

    assert_eq!(*hook.seen.lock().unwrap(), vec![true]);
  }

  #[tokio::test]
  async fn test_request_hooks_run_in_registration_order() {
    let transport = Arc::new(PathCapturingTransport {
      paths: Mutex::new(Vec::new()),
    });
    let client = ApiClient::new(
      transport.clone(),
      vec![
        Arc::new(TaggingHook { tag: "-first" }),
        Arc::new(TaggingHook { tag: "-second" }),
      ],
      vec![],
    );

    client.get("/path").await.unwrap();

    assert_eq!(*transport.paths.lock().unwrap(), vec!["/path-first-second".to_string()]);
  }

  #[tokio::test]
  async fn test_transport_errors_propagate_and_skip_response_hooks() {
    let hook = Arc::new(RecordingResponseHook {
      seen: Mutex::new(Vec::new()),
    });
    let client = ApiClient::new(
      Arc::new(FakeTransport::failing("connect ECONNREFUSED")),
      vec![],
      vec![hook.clone()],
    );

    let err = client.get("/api/quran/surahs").await.unwrap_err();

    assert!(err.to_string().contains("ECONNREFUSED"));
    assert!(hook.seen.lock().unwrap().is_empty());
  }
}
