//! Request and response types for the API pipeline.

use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;

/// A logical API request before transport.
#[derive(Debug, Clone)]
pub struct ApiRequest {
  pub method: Method,
  /// Path relative to the API base URL, query string included.
  pub path: String,
  pub body: Option<Value>,
  pub headers: HeaderMap,
}

impl ApiRequest {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      method,
      path: path.into(),
      body: None,
      headers: HeaderMap::new(),
    }
  }

  pub fn get(path: impl Into<String>) -> Self {
    Self::new(Method::GET, path)
  }

  pub fn post(path: impl Into<String>, body: Value) -> Self {
    let mut request = Self::new(Method::POST, path);
    request.body = Some(body);
    request
  }
}

/// Response delivered to callers.
///
/// `served_from_cache` marks synthesized responses so the post-flight
/// hooks leave them alone instead of re-caching them.
#[derive(Debug, Clone)]
pub struct ApiResponse {
  pub status: u16,
  pub body: Value,
  pub served_from_cache: bool,
}

impl ApiResponse {
  pub fn from_network(status: u16, body: Value) -> Self {
    Self {
      status,
      body,
      served_from_cache: false,
    }
  }

  /// Synthesize a success response from a cache entry.
  pub fn from_cache(body: Value) -> Self {
    Self {
      status: 200,
      body,
      served_from_cache: true,
    }
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}
