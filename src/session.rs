//! Identity of the signed-in user, as remembered by client storage.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::api::Session;
use crate::notify::{Notification, Notifier};
use crate::storage::{ClientStorage, ACCESS_TOKEN, LOGIN_USER};

const NOT_LOGGED_IN: &str = "could not load user info: not logged in or login expired, please log in again";

/// What client storage says about the signed-in user
enum Stored {
  /// No access token; the current snapshot is left as it is
  LoggedOut,
  /// Token present; `None` when no user blob was stored
  User(Option<Session>),
}

/// Read-only holder of the current [`Session`].
///
/// The store never writes to client storage; logging in and out happens
/// elsewhere and `load_session` picks up whatever is there.
pub struct SessionStore {
  storage: Arc<dyn ClientStorage>,
  notifier: Arc<dyn Notifier>,
  session: RwLock<Option<Session>>,
  loading: AtomicBool,
}

impl SessionStore {
  pub fn new(storage: Arc<dyn ClientStorage>, notifier: Arc<dyn Notifier>) -> Self {
    Self {
      storage,
      notifier,
      session: RwLock::new(None),
      loading: AtomicBool::new(false),
    }
  }

  /// (Re)load the session snapshot from client storage.
  ///
  /// Without an access token, or with an unreadable `login_user`, the
  /// previous snapshot is kept and the user is told why. A token with no
  /// stored user quietly clears the snapshot.
  pub fn load_session(&self) -> Option<Session> {
    self.loading.store(true, Ordering::SeqCst);
    let loaded = self.read_session();
    self.loading.store(false, Ordering::SeqCst);

    let session = match loaded {
      Ok(Stored::User(session)) => session,
      Ok(Stored::LoggedOut) => return None,
      Err(message) => {
        tracing::warn!("{}", message);
        self.notifier.notify(Notification::error(message));
        return None;
      }
    };

    match &session {
      Some(session) => {
        tracing::debug!(user_id = session.user_id, role = ?session.role, "session loaded")
      }
      None => tracing::debug!("no stored user, session cleared"),
    }
    if let Ok(mut current) = self.session.write() {
      *current = session.clone();
    }
    session
  }

  fn read_session(&self) -> Result<Stored, String> {
    let token = self
      .storage
      .get(ACCESS_TOKEN)
      .map_err(|e| format!("could not load user info: {}", e))?;

    if token.map_or(true, |t| t.is_empty()) {
      self.notifier.notify(Notification::warning(NOT_LOGGED_IN));
      return Ok(Stored::LoggedOut);
    }

    let Some(blob) = self
      .storage
      .get(LOGIN_USER)
      .map_err(|e| format!("could not load user info: {}", e))?
    else {
      return Ok(Stored::User(None));
    };

    serde_json::from_str::<Session>(&blob)
      .map(|session| Stored::User(Some(session)))
      .map_err(|e| format!("could not load user info: {}", e))
  }

  /// The last successfully loaded session.
  pub fn session(&self) -> Option<Session> {
    self.session.read().ok().and_then(|s| s.clone())
  }

  pub fn is_loading(&self) -> bool {
    self.loading.load(Ordering::SeqCst)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::Role;
  use crate::notify::Level;
  use crate::storage::MemoryStorage;
  use crate::test_support::RecordingNotifier;

  fn store_over(storage: MemoryStorage) -> (SessionStore, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let store = SessionStore::new(Arc::new(storage), notifier.clone());
    (store, notifier)
  }

  #[test]
  fn test_loads_session_when_token_present() {
    let (store, notifier) = store_over(MemoryStorage::with_entries([
      (ACCESS_TOKEN, "t"),
      (LOGIN_USER, r#"{"user_id": 7, "role": "DEVELOPER", "username": "wu"}"#),
    ]));

    let session = store.load_session().unwrap();
    assert_eq!(session.user_id, 7);
    assert_eq!(session.role, Role::Developer);
    assert_eq!(store.session(), Some(session));
    assert!(!store.is_loading());
    assert!(notifier.notifications().is_empty());
  }

  #[test]
  fn test_without_token_warns_and_stays_unset() {
    let (store, notifier) = store_over(MemoryStorage::with_entries([(
      LOGIN_USER,
      r#"{"user_id": 7, "role": "ADMIN"}"#,
    )]));

    assert_eq!(store.load_session(), None);
    assert_eq!(store.session(), None);

    let notes = notifier.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, Level::Warning);
    assert_eq!(notes[0].duration, std::time::Duration::from_millis(4000));
  }

  #[test]
  fn test_corrupt_blob_reports_error() {
    let (store, notifier) = store_over(MemoryStorage::with_entries([
      (ACCESS_TOKEN, "t"),
      (LOGIN_USER, "{not json"),
    ]));

    assert_eq!(store.load_session(), None);
    let notes = notifier.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, Level::Error);
    assert!(notes[0].message.starts_with("could not load user info"));
  }

  #[test]
  fn test_token_without_stored_user_clears_quietly() {
    let storage = Arc::new(MemoryStorage::with_entries([
      (ACCESS_TOKEN, "t"),
      (LOGIN_USER, r#"{"user_id": 1, "role": "ADMIN"}"#),
    ]));
    let notifier = Arc::new(RecordingNotifier::default());
    let store = SessionStore::new(storage.clone(), notifier.clone());

    store.load_session().unwrap();
    storage.clear().unwrap();
    storage.set(ACCESS_TOKEN, "t").unwrap();

    assert_eq!(store.load_session(), None);
    assert_eq!(store.session(), None);
    assert!(notifier.notifications().is_empty());
  }

  #[test]
  fn test_failed_reload_keeps_previous_session() {
    let storage = Arc::new(MemoryStorage::with_entries([
      (ACCESS_TOKEN, "t"),
      (LOGIN_USER, r#"{"user_id": 1, "role": "ADMIN"}"#),
    ]));
    let notifier = Arc::new(RecordingNotifier::default());
    let store = SessionStore::new(storage.clone(), notifier);

    store.load_session().unwrap();
    storage.set(LOGIN_USER, "garbage").unwrap();

    assert_eq!(store.load_session(), None);
    assert_eq!(store.session().map(|s| s.user_id), Some(1));
  }
}
