//! HTTP client with bearer auth and transparent token refresh.

use futures::future::{join, join_all};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::notify::{LoggingNavigator, Navigator, Notification, Notifier, TracingNotifier};
use crate::routes::Route;
use crate::storage::{ClientStorage, ACCESS_TOKEN, REFRESH_TOKEN};

use super::api_types::{error_notice, failure_message, RefreshResponse, GENERIC_FAILURE};
use super::refresh::{Begin, LeaderGuard, RefreshCoordinator};
use super::transport::{ApiRequest, RawResponse, ReqwestTransport, Transport, TransportError};
use super::ApiError;

pub const REFRESH_PATH: &str = "/user/refresh";

const NETWORK_ERROR: &str = "network error, please try again later";
const SESSION_EXPIRED: &str = "session expired, please log in again";

/// How a response should be handed back to the caller
enum Disposition {
  Body(Value),
  Unauthorized,
  Rejected(ApiError),
}

/// Console API client.
///
/// Cloning is cheap; clones share the transport, storage and the refresh
/// coordinator, so a refresh started through one clone is seen by all.
#[derive(Clone)]
pub struct ApiClient {
  transport: Arc<dyn Transport>,
  storage: Arc<dyn ClientStorage>,
  notifier: Arc<dyn Notifier>,
  navigator: Arc<dyn Navigator>,
  refresh: Arc<RefreshCoordinator>,
  timeout: Duration,
}

impl ApiClient {
  pub fn new(transport: Arc<dyn Transport>, storage: Arc<dyn ClientStorage>) -> Self {
    Self {
      transport,
      storage,
      notifier: Arc::new(TracingNotifier),
      navigator: Arc::new(LoggingNavigator),
      refresh: Arc::new(RefreshCoordinator::new()),
      timeout: Duration::from_millis(5000),
    }
  }

  /// Client talking HTTP to the configured backend.
  pub fn from_config(config: &Config, storage: Arc<dyn ClientStorage>) -> color_eyre::Result<Self> {
    let transport = ReqwestTransport::new(&config.api.base_url, config.api.timeout())?;
    Ok(Self::new(Arc::new(transport), storage).with_timeout(config.api.timeout()))
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
    self.navigator = navigator;
    self
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn storage(&self) -> &Arc<dyn ClientStorage> {
    &self.storage
  }

  pub fn notifier(&self) -> &Arc<dyn Notifier> {
    &self.notifier
  }

  /// Whether a token refresh is currently in flight.
  pub fn is_refreshing(&self) -> bool {
    self.refresh.is_refreshing()
  }

  /// Send a request and return the response body.
  ///
  /// Error statuses that carry a body are reported to the notifier and
  /// still returned as `Ok`; callers look for the failure marker themselves.
  /// A 401 is answered by refreshing the access token and replaying the
  /// request, which the caller never sees unless the refresh fails.
  pub async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
    let response = self.dispatch(self.authorize(request.clone())).await?;

    match self.settle(response) {
      Disposition::Body(body) => Ok(body),
      Disposition::Rejected(e) => Err(e),
      Disposition::Unauthorized => self.recover(request).await,
    }
  }

  /// Plain `GET` of `path`.
  pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
    self.send(ApiRequest::get(path)).await
  }

  /// Drop the credential pair and everything else kept for this user.
  pub fn logout(&self) -> Result<(), ApiError> {
    self
      .storage
      .clear()
      .map_err(|e| ApiError::Storage(e.to_string()))?;
    tracing::info!("client storage cleared");
    Ok(())
  }

  fn authorize(&self, mut request: ApiRequest) -> ApiRequest {
    match self.storage.get(ACCESS_TOKEN) {
      Ok(Some(token)) if !token.is_empty() => request.bearer = Some(token),
      Ok(_) => {}
      Err(e) => tracing::warn!("Failed to read access token: {}", e),
    }
    request
  }

  /// Send through the transport under the client timeout, without any
  /// notification side effects.
  async fn call_transport(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
    let timeout_ms = self.timeout.as_millis() as u64;
    match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
      Ok(Ok(response)) => Ok(response),
      Ok(Err(TransportError::Timeout)) | Err(_) => Err(ApiError::Timeout(timeout_ms)),
      Ok(Err(TransportError::Connect(e))) => Err(ApiError::Network(e)),
    }
  }

  async fn dispatch(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
    let path = request.path.clone();
    self.call_transport(request).await.map_err(|e| {
      tracing::warn!(path = %path, "request failed: {}", e);
      self.notifier.notify(Notification::error(NETWORK_ERROR));
      e
    })
  }

  fn settle(&self, response: RawResponse) -> Disposition {
    if response.is_success() {
      return Disposition::Body(response.body.unwrap_or(Value::Null));
    }

    match response.body {
      Some(_) if response.status == 401 => Disposition::Unauthorized,
      Some(body) => {
        let message = error_notice(&body).unwrap_or_else(|| GENERIC_FAILURE.to_string());
        tracing::debug!(status = response.status, "server reported failure: {}", message);
        self.notifier.notify(Notification::error(message));
        Disposition::Body(body)
      }
      None => {
        tracing::warn!(status = response.status, "error status without body");
        self.notifier.notify(Notification::error(NETWORK_ERROR));
        Disposition::Rejected(ApiError::Http(response.status))
      }
    }
  }

  /// Handle a 401 on a first attempt.
  async fn recover(&self, request: ApiRequest) -> Result<Value, ApiError> {
    let refresh_token = match self.storage.get(REFRESH_TOKEN) {
      Ok(Some(token)) if !token.is_empty() => token,
      Ok(_) => {
        tracing::warn!(path = %request.path, "access token rejected and no refresh token stored");
        self.expire_session();
        return Err(ApiError::SessionExpired);
      }
      Err(e) => {
        tracing::warn!("Failed to read refresh token: {}", e);
        self.expire_session();
        return Err(ApiError::SessionExpired);
      }
    };

    match self
      .refresh
      .begin(request)
      .map_err(|e| ApiError::State(e.to_string()))?
    {
      Begin::Queued(reply) => reply.await.unwrap_or(Err(ApiError::ReplayDropped)),
      Begin::Leader(request, guard) => self.lead_refresh(request, guard, &refresh_token).await,
    }
  }

  /// Refresh the access token, then replay everything that queued up behind
  /// the refresh (oldest first) followed by `request` itself.
  async fn lead_refresh(
    &self,
    request: ApiRequest,
    guard: LeaderGuard<'_>,
    refresh_token: &str,
  ) -> Result<Value, ApiError> {
    tracing::info!(path = %request.path, "access token rejected, refreshing");
    let refreshed = self.refresh_access_token(refresh_token).await;

    let pending = guard.finish().unwrap_or_else(|e| {
      tracing::warn!("Failed to drain refresh queue: {}", e);
      Default::default()
    });

    match refreshed {
      Ok(token) => {
        tracing::info!(queued = pending.len(), "access token refreshed, replaying requests");
        let queued = join_all(pending.into_iter().map(|pending| {
          let request = pending.request.with_bearer(&token);
          let reply = pending.reply;
          async move {
            let result = self.replay(request).await;
            // The waiter may have been dropped; nothing to deliver then
            let _ = reply.send(result);
          }
        }));

        let (_, result) = join(queued, self.replay(request.with_bearer(&token))).await;
        result
      }
      Err(e) => {
        tracing::warn!(queued = pending.len(), "token refresh failed: {}", e);
        for pending in pending {
          let _ = pending.reply.send(Err(ApiError::SessionExpired));
        }
        self.expire_session();
        Err(ApiError::SessionExpired)
      }
    }
  }

  /// Call the refresh endpoint directly, bypassing 401 handling, and
  /// persist the rotated credentials.
  async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, ApiError> {
    let request = ApiRequest::post(REFRESH_PATH).with_bearer(refresh_token);
    let response = self.call_transport(request).await?;

    let body = match response.body {
      Some(body) if response.is_success() => body,
      Some(body) => {
        let message = failure_message(&body).unwrap_or_else(|| format!("status {}", response.status));
        return Err(ApiError::RefreshRejected(message));
      }
      None => return Err(ApiError::RefreshRejected(format!("status {}", response.status))),
    };

    if let Some(message) = failure_message(&body) {
      return Err(ApiError::RefreshRejected(message));
    }

    let refreshed: RefreshResponse =
      serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;

    self
      .storage
      .set(ACCESS_TOKEN, &refreshed.access_token)
      .map_err(|e| ApiError::Storage(e.to_string()))?;
    if let Some(rotated) = &refreshed.refresh_token {
      self
        .storage
        .set(REFRESH_TOKEN, rotated)
        .map_err(|e| ApiError::Storage(e.to_string()))?;
    }

    Ok(refreshed.access_token)
  }

  /// Second attempt with a fresh token. Another 401 here is final.
  async fn replay(&self, request: ApiRequest) -> Result<Value, ApiError> {
    tracing::debug!(path = %request.path, "replaying request");
    let response = self.dispatch(request).await?;

    match self.settle(response) {
      Disposition::Body(body) => Ok(body),
      Disposition::Rejected(e) => Err(e),
      Disposition::Unauthorized => {
        tracing::warn!("refreshed access token was rejected");
        self.expire_session();
        Err(ApiError::SessionExpired)
      }
    }
  }

  fn expire_session(&self) {
    if let Err(e) = self.storage.clear() {
      tracing::warn!("Failed to clear client storage: {}", e);
    }
    self.notifier.notify(Notification::error(SESSION_EXPIRED));
    self.navigator.redirect(Route::Login);
  }
}
