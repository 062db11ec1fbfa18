//! HTTP transport behind the interception pipeline.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::types::{ApiRequest, ApiResponse};

/// Executes a request against the network.
///
/// Failures here are real failures (connectivity, server errors) and
/// propagate to the caller untouched; the cache layer never converts them
/// into synthetic successes.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
  client: reqwest::Client,
  base_url: Url,
}

impl HttpTransport {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
    let base_url =
      Url::parse(base_url).map_err(|e| eyre!("Invalid API base URL {}: {}", base_url, e))?;

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { client, base_url })
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base_url
      .join(path)
      .map_err(|e| eyre!("Invalid request path {}: {}", path, e))
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
    let url = self.endpoint(&request.path)?;

    let mut builder = self
      .client
      .request(request.method.clone(), url)
      .headers(request.headers.clone());
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let response = builder
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", request.path, e))?;

    let status = response.status();
    let text = response
      .text()
      .await
      .map_err(|e| eyre!("Failed to read response from {}: {}", request.path, e))?;

    if !status.is_success() {
      return Err(eyre!(
        "Request to {} failed with status {}",
        request.path,
        status
      ));
    }

    let body = if text.is_empty() {
      Value::Null
    } else {
      serde_json::from_str(&text)
        .map_err(|e| eyre!("Malformed JSON from {}: {}", request.path, e))?
    };

    Ok(ApiResponse::from_network(status.as_u16(), body))
  }
}
