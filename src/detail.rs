//! Single-record lookups (`GET /<kind>/detail/{id}`).
//!
//! Details are never cached; every call goes to the server.

use serde_json::Value;
use thiserror::Error;

use crate::api::{
  ApiClient, ApiError, ApiOutcome, Detection, Media, Model, Operation, User,
};
use crate::cache::{Resource, ResourceKind};
use crate::notify::Notification;

#[derive(Error, Debug)]
pub enum DetailError {
  /// Id 0 never names a record; nothing was sent
  #[error("could not load {kind} detail: {kind} ID is empty")]
  MissingId { kind: ResourceKind },

  #[error("could not load {kind} ID={id} detail: {message}")]
  Rejected {
    kind: ResourceKind,
    id: u64,
    message: String,
  },

  #[error("could not load {kind} ID={id} detail: {source}")]
  Request {
    kind: ResourceKind,
    id: u64,
    #[source]
    source: ApiError,
  },
}

/// Fetches one record of any kind through the shared client.
#[derive(Clone)]
pub struct DetailFetcher {
  client: ApiClient,
}

impl DetailFetcher {
  pub fn new(client: ApiClient) -> Self {
    Self { client }
  }

  pub async fn get_media_detail(&self, id: u64) -> Result<Media, DetailError> {
    self.get_detail(id).await
  }

  pub async fn get_model_detail(&self, id: u64) -> Result<Model, DetailError> {
    self.get_detail(id).await
  }

  pub async fn get_detection_detail(&self, id: u64) -> Result<Detection, DetailError> {
    self.get_detail(id).await
  }

  pub async fn get_user_detail(&self, id: u64) -> Result<User, DetailError> {
    self.get_detail(id).await
  }

  pub async fn get_operation_detail(&self, id: u64) -> Result<Operation, DetailError> {
    self.get_detail(id).await
  }

  /// Fetch `/<kind>/detail/{id}` and unwrap the record under the `<kind>` field.
  pub async fn get_detail<T: Resource>(&self, id: u64) -> Result<T, DetailError> {
    let kind = T::KIND;
    if id == 0 {
      return Err(DetailError::MissingId { kind });
    }

    let body = match self.client.get(&kind.detail_path(id)).await {
      Ok(body) => body,
      Err(source) => {
        let err = DetailError::Request { kind, id, source };
        tracing::error!("{}", err);
        self.client.notifier().notify(Notification::error(err.to_string()));
        return Err(err);
      }
    };
    tracing::debug!(%kind, id, "detail response: {}", body);

    match ApiOutcome::<Value>::from_body(body) {
      Ok(ApiOutcome::Success(mut body)) => {
        let record = body.get_mut(kind.name()).map(Value::take).unwrap_or(Value::Null);
        serde_json::from_value(record).map_err(|e| DetailError::Request {
          kind,
          id,
          source: ApiError::Decode(e.to_string()),
        })
      }
      Ok(ApiOutcome::Failure { message }) => Err(DetailError::Rejected { kind, id, message }),
      Err(source) => Err(DetailError::Request { kind, id, source }),
    }
  }
}
