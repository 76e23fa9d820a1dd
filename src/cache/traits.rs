//! Core traits and types for the resource cache.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::api::ApiError;

/// The resource kinds the console lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
  Media,
  Model,
  Detection,
  User,
  Operation,
}

pub const KINDS: &[ResourceKind] = &[
  ResourceKind::Media,
  ResourceKind::Model,
  ResourceKind::Detection,
  ResourceKind::User,
  ResourceKind::Operation,
];

/// Whose resources a list request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
  All,
  Owner(u64),
}

impl ResourceKind {
  /// Path segment and detail field name, e.g. "media"
  pub fn name(self) -> &'static str {
    match self {
      ResourceKind::Media => "media",
      ResourceKind::Model => "model",
      ResourceKind::Detection => "detection",
      ResourceKind::User => "user",
      ResourceKind::Operation => "operation",
    }
  }

  /// Field holding the items in list responses, e.g. "medias"
  pub fn list_field(self) -> &'static str {
    match self {
      ResourceKind::Media => "medias",
      ResourceKind::Model => "models",
      ResourceKind::Detection => "detections",
      ResourceKind::User => "users",
      ResourceKind::Operation => "operations",
    }
  }

  /// Only admins and developers may list this kind at all.
  pub fn is_role_gated(self) -> bool {
    matches!(self, ResourceKind::User | ResourceKind::Operation)
  }

  /// Whether regular users get their own subset instead of everything.
  pub fn is_owner_scoped(self) -> bool {
    matches!(self, ResourceKind::Media | ResourceKind::Detection)
  }

  /// e.g. `/media/medias/all` or `/media/medias/7`
  pub fn list_path(self, scope: ListScope) -> String {
    let scope = match scope {
      ListScope::Owner(user_id) if self.is_owner_scoped() => user_id.to_string(),
      _ => "all".to_string(),
    };
    format!("/{}/{}/{}", self.name(), self.list_field(), scope)
  }

  /// e.g. `/model/detail/3`
  pub fn detail_path(self, id: u64) -> String {
    format!("/{}/detail/{}", self.name(), id)
  }

  /// Message returned when the role gate refuses a list.
  pub fn permission_denied_message(self) -> String {
    format!(
      "insufficient permissions: only administrators or developers can view the {} list",
      self.name()
    )
  }

  pub fn parse(s: &str) -> Option<Self> {
    let s = s.trim().to_lowercase();
    KINDS
      .iter()
      .copied()
      .find(|k| k.name() == s || k.list_field() == s)
  }
}

impl std::fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

/// Trait for entities kept in the resource cache.
pub trait Resource: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Which collection this type belongs to
  const KIND: ResourceKind;
}

/// Why a list fetch came back empty.
#[derive(Error, Debug)]
pub enum ListError {
  /// Refused locally by the role check; nothing was sent
  #[error("{0}")]
  PermissionDenied(String),

  /// The server answered with a failure marker
  #[error("{0}")]
  Rejected(String),

  #[error(transparent)]
  Request(#[from] ApiError),
}

/// Result of a list fetch.
#[derive(Debug)]
pub struct ListPage<T> {
  pub items: Vec<T>,
  pub total: u64,
  /// True when served from the cache without a network call
  pub from_cache: bool,
  pub error: Option<ListError>,
}

impl<T> ListPage<T> {
  /// Page fresh from the network.
  pub fn from_network(items: Vec<T>, total: u64) -> Self {
    Self {
      items,
      total,
      from_cache: false,
      error: None,
    }
  }

  /// Page served from a fresh cache entry.
  pub fn from_cache(items: Vec<T>, total: u64) -> Self {
    Self {
      items,
      total,
      from_cache: true,
      error: None,
    }
  }

  /// Empty page carrying the reason.
  pub fn failed(error: ListError) -> Self {
    Self {
      items: Vec::new(),
      total: 0,
      from_cache: false,
      error: Some(error),
    }
  }

  pub fn is_ok(&self) -> bool {
    self.error.is_none()
  }
}
