use color_eyre::Result;

/// Trait for client storage backends.
///
/// Values are plain strings; callers own any (de)serialization.
pub trait ClientStorage: Send + Sync {
  /// Get the value stored under `key`.
  fn get(&self, key: &str) -> Result<Option<String>>;

  /// Store `value` under `key`, replacing any previous value.
  fn set(&self, key: &str, value: &str) -> Result<()>;

  /// Remove every key.
  fn clear(&self) -> Result<()>;
}
