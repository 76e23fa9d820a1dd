use thiserror::Error;

/// Why a call to the backend produced no usable response.
///
/// Business-level failures (`failure_message` bodies) are not errors at this
/// layer; see [`super::ApiOutcome`].
#[derive(Error, Debug)]
pub enum ApiError {
  /// The credential pair is gone or could not be renewed. The client has
  /// already cleared storage and redirected to the login route.
  #[error("session expired, please log in again")]
  SessionExpired,

  /// No response at all (connection refused, DNS, TLS, ...)
  #[error("network error: {0}")]
  Network(String),

  #[error("request timed out after {0} ms")]
  Timeout(u64),

  /// An error status without any body to hand back to the caller
  #[error("server responded with status {0} and no body")]
  Http(u16),

  #[error("invalid response body: {0}")]
  Decode(String),

  /// The refresh endpoint refused to issue a new access token
  #[error("token refresh rejected: {0}")]
  RefreshRejected(String),

  #[error("client storage failure: {0}")]
  Storage(String),

  #[error("refresh coordination failure: {0}")]
  State(String),

  /// The refresh that this request was queued behind went away without
  /// answering.
  #[error("queued request was dropped before it could be replayed")]
  ReplayDropped,
}
