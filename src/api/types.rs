use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role of the signed-in user.
///
/// Anything the backend sends besides `ADMIN` and `DEVELOPER` is kept
/// verbatim and treated as a regular user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
  Admin,
  Developer,
  Other(String),
}

impl Role {
  /// Admins and developers see every user's resources and the admin lists.
  pub fn is_privileged(&self) -> bool {
    matches!(self, Role::Admin | Role::Developer)
  }
}

impl From<String> for Role {
  fn from(s: String) -> Self {
    match s.as_str() {
      "ADMIN" => Role::Admin,
      "DEVELOPER" => Role::Developer,
      _ => Role::Other(s),
    }
  }
}

impl From<Role> for String {
  fn from(role: Role) -> Self {
    match role {
      Role::Admin => "ADMIN".to_string(),
      Role::Developer => "DEVELOPER".to_string(),
      Role::Other(s) => s,
    }
  }
}

/// Identity snapshot of the signed-in user, as stored under `login_user`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
  pub user_id: u64,
  pub role: Role,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Session {
  pub fn new(user_id: u64, role: Role) -> Self {
    Self {
      user_id,
      role,
      extra: Map::new(),
    }
  }

  pub fn username(&self) -> Option<&str> {
    self.extra.get("username").and_then(Value::as_str)
  }
}

/// Uploaded image or video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
  #[serde(alias = "media_id")]
  pub id: u64,
  pub user_id: Option<u64>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Detection model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
  #[serde(alias = "model_id")]
  pub id: u64,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Result of running a model over a media item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  #[serde(alias = "detection_id")]
  pub id: u64,
  pub user_id: Option<u64>,
  pub media_id: Option<u64>,
  pub model_id: Option<u64>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Console account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  #[serde(alias = "user_id")]
  pub id: u64,
  pub username: Option<String>,
  pub role: Option<Role>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Operation log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
  #[serde(alias = "operation_id")]
  pub id: u64,
  pub user_id: Option<u64>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Page selection for list endpoints (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub page: u32,
  pub per_page: u32,
}

impl PageRequest {
  pub fn new(page: u32, per_page: u32) -> Self {
    Self { page, per_page }
  }
}

impl Default for PageRequest {
  fn default() -> Self {
    Self {
      page: 1,
      per_page: 5,
    }
  }
}
