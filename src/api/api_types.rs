//! Response shapes of the console backend.
//!
//! Every endpoint answers either with its payload or with an object carrying
//! `failure_message`. The payload side is decoded into typed structs here so
//! the rest of the crate never probes raw JSON for the marker.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::ApiError;

/// Shown when the server reports a failure without saying why
pub const GENERIC_FAILURE: &str = "request failed";

/// Business-level result of a call that did reach the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
  Success(T),
  Failure { message: String },
}

impl<T: DeserializeOwned> ApiOutcome<T> {
  /// Classify a response body. A `failure_message` anywhere the backend
  /// puts it wins over whatever else the body holds.
  pub fn from_body(body: Value) -> Result<Self, ApiError> {
    if let Some(message) = failure_message(&body) {
      return Ok(ApiOutcome::Failure { message });
    }
    serde_json::from_value(body)
      .map(ApiOutcome::Success)
      .map_err(|e| ApiError::Decode(e.to_string()))
  }
}

/// Extract the top-level failure marker from a body, if any.
///
/// Only the top level decides whether a call failed; records such as an
/// operation log entry may carry a `failure_message` of their own. An
/// empty marker still counts as a failure.
pub fn failure_message(body: &Value) -> Option<String> {
  marker_text(body.get("failure_message")?)
}

/// Text to show for an error status. Operation-logged endpoints nest the
/// marker under `operation`.
pub fn error_notice(body: &Value) -> Option<String> {
  failure_message(body).or_else(|| {
    body
      .get("operation")
      .and_then(|op| op.get("failure_message"))
      .and_then(marker_text)
  })
}

fn marker_text(marker: &Value) -> Option<String> {
  match marker {
    Value::Null => None,
    Value::String(s) if s.is_empty() => Some(GENERIC_FAILURE.to_string()),
    Value::String(s) => Some(s.clone()),
    other => Some(other.to_string()),
  }
}

/// Page of a list endpoint, e.g. `{"medias": [...], "total": 3}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListResponse<T> {
  pub items: Vec<T>,
  pub total: u64,
}

impl<T: DeserializeOwned> ListResponse<T> {
  /// Decode a list body whose items live under `field`.
  pub fn from_body(body: Value, field: &str) -> Result<ApiOutcome<Self>, ApiError> {
    #[derive(Deserialize)]
    struct Raw {
      #[serde(default)]
      total: Option<u64>,
    }

    if let Some(message) = failure_message(&body) {
      return Ok(ApiOutcome::Failure { message });
    }

    let items_value = body
      .get(field)
      .cloned()
      .ok_or_else(|| ApiError::Decode(format!("missing list field {}", field)))?;
    let items: Vec<T> = serde_json::from_value(items_value)
      .map_err(|e| ApiError::Decode(format!("{}: {}", field, e)))?;
    let raw: Raw =
      serde_json::from_value(body).map_err(|e| ApiError::Decode(format!("total: {}", e)))?;

    let total = raw.total.unwrap_or(items.len() as u64);
    Ok(ApiOutcome::Success(Self { items, total }))
  }
}

/// Answer of `POST /user/refresh`
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
  pub access_token: String,
  /// Present when the backend rotates the refresh token as well
  #[serde(default)]
  pub refresh_token: Option<String>,
}
