//! Resource store that answers list requests from a short-lived cache.

use chrono::Duration;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::api::{
  ApiClient, ApiOutcome, ApiRequest, Detection, ListResponse, Media, Model, Operation,
  PageRequest, Session, User,
};

use super::collection::CachedCollection;
use super::traits::{ListError, ListPage, ListScope, Resource, ResourceKind, KINDS};

/// Cached lists for every resource kind.
///
/// One store is meant to be shared (e.g. behind an `Arc`) by everything that
/// shows these lists, so a page fetched by one view is reused by the next.
pub struct ResourceStore {
  client: ApiClient,
  /// How long before a cached list is refetched
  stale_time: Duration,
  media: Mutex<CachedCollection<Media>>,
  models: Mutex<CachedCollection<Model>>,
  detections: Mutex<CachedCollection<Detection>>,
  users: Mutex<CachedCollection<User>>,
  operations: Mutex<CachedCollection<Operation>>,
}

impl ResourceStore {
  pub fn new(client: ApiClient) -> Self {
    Self {
      client,
      stale_time: Duration::minutes(5),
      media: Mutex::default(),
      models: Mutex::default(),
      detections: Mutex::default(),
      users: Mutex::default(),
      operations: Mutex::default(),
    }
  }

  /// Set the stale time for cached lists.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  pub fn client(&self) -> &ApiClient {
    &self.client
  }

  /// Media list; admins and developers see everyone's, others their own.
  pub async fn fetch_media_list(
    &self,
    session: &Session,
    page: PageRequest,
    force_refresh: bool,
  ) -> ListPage<Media> {
    self
      .fetch_list(&self.media, scope_for(session), page, force_refresh)
      .await
  }

  pub async fn fetch_model_list(&self, page: PageRequest, force_refresh: bool) -> ListPage<Model> {
    self
      .fetch_list(&self.models, ListScope::All, page, force_refresh)
      .await
  }

  /// Detection records; admins and developers see everyone's, others their own.
  pub async fn fetch_detection_list(
    &self,
    session: &Session,
    page: PageRequest,
    force_refresh: bool,
  ) -> ListPage<Detection> {
    self
      .fetch_list(&self.detections, scope_for(session), page, force_refresh)
      .await
  }

  /// User list, for admins and developers only.
  pub async fn fetch_user_list(
    &self,
    session: &Session,
    page: PageRequest,
    force_refresh: bool,
  ) -> ListPage<User> {
    if let Some(denied) = deny_unprivileged(session) {
      return denied;
    }
    self
      .fetch_list(&self.users, ListScope::All, page, force_refresh)
      .await
  }

  /// Operation log, for admins and developers only.
  pub async fn fetch_operation_list(
    &self,
    session: &Session,
    page: PageRequest,
    force_refresh: bool,
  ) -> ListPage<Operation> {
    if let Some(denied) = deny_unprivileged(session) {
      return denied;
    }
    self
      .fetch_list(&self.operations, ListScope::All, page, force_refresh)
      .await
  }

  /// Fetch a list with cache-first strategy.
  ///
  /// 1. If the cached list is non-empty and fresh (and not forced), return it
  /// 2. Otherwise fetch from the network
  /// 3. Only a clean page replaces the cache; failures leave it untouched
  async fn fetch_list<T: Resource>(
    &self,
    slot: &Mutex<CachedCollection<T>>,
    scope: ListScope,
    page: PageRequest,
    force_refresh: bool,
  ) -> ListPage<T> {
    let kind = T::KIND;

    {
      let cached = lock(slot);
      if !force_refresh && cached.can_serve(self.stale_time) {
        tracing::debug!(%kind, items = cached.items.len(), "serving list from cache");
        return ListPage::from_cache(cached.items.clone(), cached.total);
      }
    }

    let _loading = LoadingGuard::start(slot);

    let request = ApiRequest::get(kind.list_path(scope))
      .query("page", page.page)
      .query("per_page", page.per_page);

    let outcome = match self.client.send(request).await {
      Ok(body) => ListResponse::<T>::from_body(body, kind.list_field()),
      Err(e) => Err(e),
    };

    match outcome {
      Ok(ApiOutcome::Success(list)) => {
        tracing::debug!(%kind, items = list.items.len(), total = list.total, "list fetched");
        lock(slot).store(list.items.clone(), list.total);
        ListPage::from_network(list.items, list.total)
      }
      Ok(ApiOutcome::Failure { message }) => {
        tracing::debug!(%kind, "list rejected: {}", message);
        ListPage::failed(ListError::Rejected(message))
      }
      Err(e) => {
        tracing::warn!(%kind, "Failed to fetch list: {}", e);
        ListPage::failed(ListError::Request(e))
      }
    }
  }

  /// Drop every cached list. Loading flags are left alone.
  pub fn clear_cache(&self) {
    lock(&self.media).clear();
    lock(&self.models).clear();
    lock(&self.detections).clear();
    lock(&self.users).clear();
    lock(&self.operations).clear();
    tracing::debug!("resource cache cleared");
  }

  pub fn media(&self) -> CachedCollection<Media> {
    lock(&self.media).clone()
  }

  pub fn models(&self) -> CachedCollection<Model> {
    lock(&self.models).clone()
  }

  pub fn detections(&self) -> CachedCollection<Detection> {
    lock(&self.detections).clone()
  }

  pub fn users(&self) -> CachedCollection<User> {
    lock(&self.users).clone()
  }

  pub fn operations(&self) -> CachedCollection<Operation> {
    lock(&self.operations).clone()
  }

  /// Whether a fetch for `kind` is in flight.
  pub fn is_loading(&self, kind: ResourceKind) -> bool {
    match kind {
      ResourceKind::Media => lock(&self.media).loading,
      ResourceKind::Model => lock(&self.models).loading,
      ResourceKind::Detection => lock(&self.detections).loading,
      ResourceKind::User => lock(&self.users).loading,
      ResourceKind::Operation => lock(&self.operations).loading,
    }
  }

  /// Whether any kind has a fetch in flight.
  pub fn any_loading(&self) -> bool {
    KINDS.iter().any(|kind| self.is_loading(*kind))
  }
}

fn scope_for(session: &Session) -> ListScope {
  if session.role.is_privileged() {
    ListScope::All
  } else {
    ListScope::Owner(session.user_id)
  }
}

fn deny_unprivileged<T: Resource>(session: &Session) -> Option<ListPage<T>> {
  let kind = T::KIND;
  if !kind.is_role_gated() || session.role.is_privileged() {
    return None;
  }
  tracing::debug!(%kind, user_id = session.user_id, "list refused by role check");
  Some(ListPage::failed(ListError::PermissionDenied(
    kind.permission_denied_message(),
  )))
}

// A panic while holding the lock leaves plain data behind; keep using it.
fn lock<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
  slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps `loading` set for as long as it lives, whatever way the fetch ends.
struct LoadingGuard<'a, T> {
  slot: &'a Mutex<CachedCollection<T>>,
}

impl<'a, T> LoadingGuard<'a, T> {
  fn start(slot: &'a Mutex<CachedCollection<T>>) -> Self {
    lock(slot).loading = true;
    Self { slot }
  }
}

impl<T> Drop for LoadingGuard<'_, T> {
  fn drop(&mut self) {
    lock(self.slot).loading = false;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{ApiError, Role};
  use crate::storage::{MemoryStorage, ACCESS_TOKEN, REFRESH_TOKEN};
  use crate::test_support::{list_body, list_field_of, Reply, ScriptedTransport, TestHarness};
  use serde_json::json;
  use std::sync::Arc;

  fn signed_in() -> MemoryStorage {
    MemoryStorage::with_entries([(ACCESS_TOKEN, "token"), (REFRESH_TOKEN, "refresh")])
  }

  /// Backend where every list has `count` items.
  fn backend(count: u64) -> ScriptedTransport {
    ScriptedTransport::new(move |req| Reply::ok(list_body(list_field_of(&req.path), count)))
  }

  fn store_with(transport: ScriptedTransport) -> (ResourceStore, TestHarness) {
    let h = TestHarness::new(transport, signed_in());
    (ResourceStore::new(h.client.clone()), h)
  }

  fn admin() -> Session {
    Session::new(1, Role::Admin)
  }

  fn regular(user_id: u64) -> Session {
    Session::new(user_id, Role::Other("USER".into()))
  }

  /// (item count, total, from_cache, has error)
  async fn fetch_kind(
    store: &ResourceStore,
    kind: ResourceKind,
    session: &Session,
    force: bool,
  ) -> (usize, u64, bool, bool) {
    let page = PageRequest::default();
    macro_rules! summary {
      ($page:expr) => {{
        let p = $page;
        (p.items.len(), p.total, p.from_cache, p.error.is_some())
      }};
    }
    match kind {
      ResourceKind::Media => summary!(store.fetch_media_list(session, page, force).await),
      ResourceKind::Model => summary!(store.fetch_model_list(page, force).await),
      ResourceKind::Detection => summary!(store.fetch_detection_list(session, page, force).await),
      ResourceKind::User => summary!(store.fetch_user_list(session, page, force).await),
      ResourceKind::Operation => summary!(store.fetch_operation_list(session, page, force).await),
    }
  }

  #[tokio::test]
  async fn test_second_fetch_within_ttl_hits_cache_for_every_kind() {
    for kind in KINDS {
      let (store, h) = store_with(backend(2));

      let first = fetch_kind(&store, *kind, &admin(), false).await;
      let second = fetch_kind(&store, *kind, &admin(), false).await;

      assert_eq!(first, (2, 2, false, false), "{}", kind);
      assert_eq!(second, (2, 2, true, false), "{}", kind);
      assert_eq!(h.transport.calls().len(), 1, "{}", kind);
    }
  }

  #[tokio::test]
  async fn test_force_refresh_always_hits_network() {
    for kind in KINDS {
      let (store, h) = store_with(backend(1));

      fetch_kind(&store, *kind, &admin(), false).await;
      let forced = fetch_kind(&store, *kind, &admin(), true).await;

      assert!(!forced.2, "{}", kind);
      assert_eq!(h.transport.calls().len(), 2, "{}", kind);
    }
  }

  #[tokio::test]
  async fn test_clear_cache_forces_next_fetch() {
    let (store, h) = store_with(backend(3));
    for kind in KINDS {
      fetch_kind(&store, *kind, &admin(), false).await;
    }
    assert_eq!(h.transport.calls().len(), KINDS.len());

    store.clear_cache();
    assert!(store.media().items.is_empty());
    assert_eq!(store.users().last_fetch_at, None);

    for kind in KINDS {
      let again = fetch_kind(&store, *kind, &admin(), false).await;
      assert!(!again.2, "{}", kind);
    }
    assert_eq!(h.transport.calls().len(), 2 * KINDS.len());
  }

  #[tokio::test]
  async fn test_role_gate_refuses_regular_users_without_network() {
    let (store, h) = store_with(backend(3));
    let user = regular(7);

    let users = store
      .fetch_user_list(&user, PageRequest::default(), false)
      .await;
    assert!(users.items.is_empty());
    assert_eq!(users.total, 0);
    match users.error {
      Some(ListError::PermissionDenied(message)) => assert!(!message.is_empty()),
      other => panic!("unexpected {:?}", other),
    }

    let operations = store
      .fetch_operation_list(&user, PageRequest::default(), true)
      .await;
    assert!(operations.items.is_empty());
    assert!(matches!(
      operations.error,
      Some(ListError::PermissionDenied(_))
    ));

    assert!(h.transport.calls().is_empty());
  }

  #[tokio::test]
  async fn test_developer_passes_role_gate() {
    let (store, h) = store_with(backend(1));
    let developer = Session::new(2, Role::Developer);

    let page = store
      .fetch_operation_list(&developer, PageRequest::default(), false)
      .await;
    assert!(page.is_ok());
    assert_eq!(h.transport.calls()[0].path, "/operation/operations/all");
  }

  #[tokio::test]
  async fn test_regular_user_media_scenario() {
    let (store, h) = store_with(ScriptedTransport::new(|_| {
      Reply::ok(json!({
        "medias": [{"id": 11}, {"id": 12}, {"id": 13}],
        "total": 3
      }))
    }));
    let user = regular(7);

    let first = store
      .fetch_media_list(&user, PageRequest::new(1, 5), false)
      .await;
    assert!(first.is_ok());
    assert_eq!(first.total, 3);
    let ids: Vec<u64> = first.items.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![11, 12, 13]);

    let calls = h.transport.calls();
    assert_eq!(calls[0].path, "/media/medias/7");
    assert_eq!(
      calls[0].query,
      vec![
        ("page".to_string(), "1".to_string()),
        ("per_page".to_string(), "5".to_string())
      ]
    );

    let second = store
      .fetch_media_list(&user, PageRequest::new(1, 5), false)
      .await;
    assert!(second.from_cache);
    assert_eq!(second.items, first.items);
    assert_eq!(second.total, 3);
    assert_eq!(h.transport.calls().len(), 1);
  }

  #[tokio::test]
  async fn test_privileged_callers_list_everything() {
    let (store, h) = store_with(backend(1));

    store
      .fetch_detection_list(&admin(), PageRequest::default(), false)
      .await;
    store
      .fetch_detection_list(&regular(5), PageRequest::default(), true)
      .await;

    let paths: Vec<String> = h.transport.calls().into_iter().map(|c| c.path).collect();
    assert_eq!(
      paths,
      vec!["/detection/detections/all", "/detection/detections/5"]
    );
  }

  #[tokio::test]
  async fn test_user_list_failure_leaves_cache_empty() {
    let (store, _h) = store_with(ScriptedTransport::new(|_| {
      Reply::ok(json!({"failure_message": "x"}))
    }));

    let page = store
      .fetch_user_list(&admin(), PageRequest::default(), false)
      .await;
    assert!(page.items.is_empty());
    assert_eq!(page.total, 0);
    assert!(matches!(page.error, Some(ListError::Rejected(ref m)) if m == "x"));

    let cached = store.users();
    assert!(cached.items.is_empty());
    assert_eq!(cached.last_fetch_at, None);
    assert!(!cached.loading);
  }

  #[tokio::test]
  async fn test_failed_refetch_keeps_previous_cache() {
    let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter = calls.clone();
    let (store, _h) = store_with(ScriptedTransport::new(move |req| {
      if counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
        Reply::ok(list_body(list_field_of(&req.path), 2))
      } else {
        Reply::status(500, json!({"failure_message": "db down"}))
      }
    }));

    store.fetch_model_list(PageRequest::default(), false).await;
    let refetch = store.fetch_model_list(PageRequest::default(), true).await;

    assert!(refetch.items.is_empty());
    assert!(matches!(refetch.error, Some(ListError::Rejected(_))));
    let cached = store.models();
    assert_eq!(cached.items.len(), 2);
    assert_eq!(cached.total, 2);
  }

  #[tokio::test]
  async fn test_unrecognised_error_body_keeps_previous_cache() {
    let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter = calls.clone();
    let (store, _h) = store_with(ScriptedTransport::new(move |req| {
      if counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
        Reply::ok(list_body(list_field_of(&req.path), 2))
      } else {
        Reply::status(500, json!({"error": "boom"}))
      }
    }));

    store.fetch_model_list(PageRequest::default(), false).await;
    let stamped = store.models().last_fetch_at;
    let refetch = store.fetch_model_list(PageRequest::default(), true).await;

    assert!(refetch.items.is_empty());
    assert!(matches!(
      refetch.error,
      Some(ListError::Request(ApiError::Decode(_)))
    ));
    let cached = store.models();
    assert_eq!(cached.items.len(), 2);
    assert_eq!(cached.last_fetch_at, stamped);
  }

  #[tokio::test]
  async fn test_network_error_is_reported_and_clears_loading() {
    let (store, h) = store_with(ScriptedTransport::new(|_| Reply::connect_error("refused")));

    let page = store.fetch_model_list(PageRequest::default(), false).await;
    assert!(page.items.is_empty());
    assert!(matches!(page.error, Some(ListError::Request(_))));
    assert!(!store.is_loading(ResourceKind::Model));
    assert_eq!(h.notifier.notifications().len(), 1);
  }

  #[tokio::test]
  async fn test_loading_flag_only_during_fetch() {
    let (store, _h) = store_with(ScriptedTransport::new(|req| {
      Reply::ok(list_body(list_field_of(&req.path), 1)).after(std::time::Duration::from_millis(50))
    }));

    assert!(!store.is_loading(ResourceKind::Model));
    let (page, loading_midway) = tokio::join!(
      store.fetch_model_list(PageRequest::default(), false),
      async {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        store.is_loading(ResourceKind::Model)
      }
    );

    assert!(page.is_ok());
    assert!(loading_midway);
    assert!(!store.is_loading(ResourceKind::Model));
    assert!(!store.any_loading());
  }

  #[tokio::test]
  async fn test_stale_cache_is_refetched() {
    let (store, h) = store_with(backend(1));
    let store = store.with_stale_time(Duration::zero());

    store.fetch_model_list(PageRequest::default(), false).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let again = store.fetch_model_list(PageRequest::default(), false).await;

    assert!(!again.from_cache);
    assert_eq!(h.transport.calls().len(), 2);
  }

  #[tokio::test]
  async fn test_empty_list_is_never_served_from_cache() {
    let (store, h) = store_with(backend(0));

    store.fetch_model_list(PageRequest::default(), false).await;
    store.fetch_model_list(PageRequest::default(), false).await;

    assert_eq!(h.transport.calls().len(), 2);
  }
}
