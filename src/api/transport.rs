//! Wire-level request/response types and the transport seam.

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use url::Url;

/// A boxed future that resolves to a transport result
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
}

/// An outgoing request, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  pub path: String,
  pub query: Vec<(String, String)>,
  /// Bearer token to send in the `Authorization` header
  pub bearer: Option<String>,
}

impl ApiRequest {
  pub fn get(path: impl Into<String>) -> Self {
    Self {
      method: Method::Get,
      path: path.into(),
      query: Vec::new(),
      bearer: None,
    }
  }

  pub fn post(path: impl Into<String>) -> Self {
    Self {
      method: Method::Post,
      ..Self::get(path)
    }
  }

  pub fn query(mut self, key: &str, value: impl ToString) -> Self {
    self.query.push((key.to_string(), value.to_string()));
    self
  }

  pub fn with_bearer(mut self, token: &str) -> Self {
    self.bearer = Some(token.to_string());
    self
  }

  /// Resolve against a base URL, appending query parameters in order.
  pub fn url(&self, base: &Url) -> Result<Url, url::ParseError> {
    let mut url = base.join(self.path.trim_start_matches('/'))?;
    if !self.query.is_empty() {
      url
        .query_pairs_mut()
        .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    Ok(url)
  }
}

/// What came back from the server. `body` is `None` when the response had
/// no (JSON) content.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
  pub status: u16,
  pub body: Option<Value>,
}

impl RawResponse {
  pub fn new(status: u16, body: Value) -> Self {
    Self {
      status,
      body: Some(body),
    }
  }

  pub fn empty(status: u16) -> Self {
    Self { status, body: None }
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Failure to get any response at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
  Timeout,
  Connect(String),
}

/// Something that can carry an [`ApiRequest`] to the server.
pub trait Transport: Send + Sync {
  fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<RawResponse, TransportError>>;
}

/// HTTP transport backed by reqwest.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
  base_url: Url,
}

impl ReqwestTransport {
  pub fn new(base_url: &str, timeout: Duration) -> color_eyre::Result<Self> {
    use color_eyre::eyre::eyre;

    // Url::join drops the last segment unless the base ends with a slash
    let normalized = format!("{}/", base_url.trim_end_matches('/'));
    let base_url =
      Url::parse(&normalized).map_err(|e| eyre!("Invalid base URL {}: {}", base_url, e))?;

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, base_url })
  }

  async fn execute(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
    let url = request
      .url(&self.base_url)
      .map_err(|e| TransportError::Connect(format!("invalid url {}: {}", request.path, e)))?;

    let mut builder = match request.method {
      Method::Get => self.client.get(url),
      Method::Post => self.client.post(url),
    };
    if let Some(token) = &request.bearer {
      builder = builder.bearer_auth(token);
    }

    let response = builder.send().await.map_err(map_reqwest_error)?;
    let status = response.status().as_u16();
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;

    // Anything that is not JSON counts as "no body", like an empty payload
    let body = if bytes.is_empty() {
      None
    } else {
      serde_json::from_slice::<Value>(&bytes).ok()
    };

    Ok(RawResponse { status, body })
  }
}

impl Transport for ReqwestTransport {
  fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
    Box::pin(self.execute(request))
  }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
  if e.is_timeout() {
    TransportError::Timeout
  } else {
    TransportError::Connect(e.to_string())
  }
}
