//! In-process fakes shared by the unit tests.

use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::transport::BoxFuture;
use crate::api::{ApiClient, ApiRequest, RawResponse, Transport, TransportError};
use crate::notify::{Navigator, Notification, Notifier};
use crate::routes::Route;
use crate::storage::{ClientStorage, MemoryStorage};

/// Canned answer for one request
pub struct Reply {
  result: Result<RawResponse, TransportError>,
  delay: Duration,
}

impl Reply {
  pub fn ok(body: Value) -> Self {
    Self::status(200, body)
  }

  pub fn status(status: u16, body: Value) -> Self {
    Self {
      result: Ok(RawResponse::new(status, body)),
      delay: Duration::ZERO,
    }
  }

  pub fn empty(status: u16) -> Self {
    Self {
      result: Ok(RawResponse::empty(status)),
      delay: Duration::ZERO,
    }
  }

  pub fn connect_error(message: &str) -> Self {
    Self {
      result: Err(TransportError::Connect(message.to_string())),
      delay: Duration::ZERO,
    }
  }

  /// Hold the answer back for `delay`.
  pub fn after(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }
}

type Handler = Box<dyn Fn(&ApiRequest) -> Reply + Send + Sync>;

/// Transport that answers from a closure and records every request in the
/// order it was sent.
pub struct ScriptedTransport {
  handler: Handler,
  calls: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
  pub fn new<F>(handler: F) -> Self
  where
    F: Fn(&ApiRequest) -> Reply + Send + Sync + 'static,
  {
    Self {
      handler: Box::new(handler),
      calls: Mutex::new(Vec::new()),
    }
  }

  pub fn calls(&self) -> Vec<ApiRequest> {
    self.calls.lock().unwrap().clone()
  }

  pub fn count_path(&self, path: &str) -> usize {
    self.calls().iter().filter(|c| c.path == path).count()
  }
}

impl Transport for ScriptedTransport {
  fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
    let reply = (self.handler)(&request);
    self.calls.lock().unwrap().push(request);
    Box::pin(async move {
      if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
      }
      reply.result
    })
  }
}

#[derive(Default)]
pub struct RecordingNotifier {
  seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
  pub fn notifications(&self) -> Vec<Notification> {
    self.seen.lock().unwrap().clone()
  }

  pub fn messages(&self) -> Vec<String> {
    self.notifications().into_iter().map(|n| n.message).collect()
  }
}

impl Notifier for RecordingNotifier {
  fn notify(&self, notification: Notification) {
    self.seen.lock().unwrap().push(notification);
  }
}

#[derive(Default)]
pub struct RecordingNavigator {
  seen: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
  pub fn redirects(&self) -> Vec<Route> {
    self.seen.lock().unwrap().clone()
  }
}

impl Navigator for RecordingNavigator {
  fn redirect(&self, route: Route) {
    self.seen.lock().unwrap().push(route);
  }
}

/// A client wired to fakes, with handles on every fake.
pub struct TestHarness {
  pub client: ApiClient,
  pub transport: Arc<ScriptedTransport>,
  pub notifier: Arc<RecordingNotifier>,
  pub navigator: Arc<RecordingNavigator>,
}

impl TestHarness {
  pub fn new(transport: ScriptedTransport, storage: MemoryStorage) -> Self {
    let transport = Arc::new(transport);
    let notifier = Arc::new(RecordingNotifier::default());
    let navigator = Arc::new(RecordingNavigator::default());
    let storage: Arc<dyn ClientStorage> = Arc::new(storage);

    let client = ApiClient::new(transport.clone(), storage)
      .with_notifier(notifier.clone())
      .with_navigator(navigator.clone());

    Self {
      client,
      transport,
      notifier,
      navigator,
    }
  }
}

/// List body like the backend sends: `{<field>: [{id: 1}, ..], total: n}`
pub fn list_body(field: &str, count: u64) -> Value {
  let items: Vec<Value> = (1..=count).map(|id| json!({ "id": id })).collect();
  let mut body = Map::new();
  body.insert(field.to_string(), Value::Array(items));
  body.insert("total".to_string(), json!(count));
  Value::Object(body)
}

/// The list field a list path asks for, e.g. "medias" for `/media/medias/7`
pub fn list_field_of(path: &str) -> &str {
  path.split('/').nth(2).unwrap_or_default()
}
