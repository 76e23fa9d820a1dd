//! Persisted client storage for credentials and UI preferences.
//!
//! This is the key/value store the console keeps between runs:
//! - `access_token` / `refresh_token`: the credential pair
//! - `login_user`: serialized identity of the signed-in user
//! - `sidebar_collapsed`: "true" or "false"

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use traits::ClientStorage;

pub const ACCESS_TOKEN: &str = "access_token";
pub const REFRESH_TOKEN: &str = "refresh_token";
pub const LOGIN_USER: &str = "login_user";
pub const SIDEBAR_COLLAPSED: &str = "sidebar_collapsed";
