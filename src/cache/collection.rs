//! Per-kind cached collection with a staleness window.

use chrono::{DateTime, Duration, Utc};

/// Last fetched page of one resource kind.
#[derive(Debug, Clone)]
pub struct CachedCollection<T> {
  pub items: Vec<T>,
  pub total: u64,
  /// True only while a fetch for this kind is in flight
  pub loading: bool,
  pub last_fetch_at: Option<DateTime<Utc>>,
}

impl<T> Default for CachedCollection<T> {
  fn default() -> Self {
    Self {
      items: Vec::new(),
      total: 0,
      loading: false,
      last_fetch_at: None,
    }
  }
}

impl<T> CachedCollection<T> {
  /// Fresh iff fetched at most `stale_time` before `now`.
  pub fn is_fresh_at(&self, now: DateTime<Utc>, stale_time: Duration) -> bool {
    match self.last_fetch_at {
      Some(fetched) => now - fetched <= stale_time,
      None => false,
    }
  }

  pub fn is_fresh(&self, stale_time: Duration) -> bool {
    self.is_fresh_at(Utc::now(), stale_time)
  }

  /// Whether a non-forced fetch may be answered from this collection.
  pub fn can_serve(&self, stale_time: Duration) -> bool {
    !self.items.is_empty() && self.is_fresh(stale_time)
  }

  /// Replace the contents with a page that just arrived.
  pub fn store(&mut self, items: Vec<T>, total: u64) {
    self.items = items;
    self.total = total;
    self.last_fetch_at = Some(Utc::now());
  }

  /// Forget the contents. `loading` is left alone.
  pub fn clear(&mut self) {
    self.items = Vec::new();
    self.total = 0;
    self.last_fetch_at = None;
  }
}
