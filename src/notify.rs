//! User-facing notifications and navigation.
//!
//! The data layer never renders anything itself. It reports transient
//! messages through a [`Notifier`] and forces navigation (after a fatal
//! session failure) through a [`Navigator`]; the embedding UI decides how
//! either looks.

use std::time::Duration;

use crate::routes::Route;

/// How long error notifications stay visible
pub const ERROR_DURATION: Duration = Duration::from_millis(5000);
/// How long warning notifications stay visible
pub const WARNING_DURATION: Duration = Duration::from_millis(4000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Warning,
  Error,
}

/// A timed, transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub level: Level,
  pub message: String,
  pub duration: Duration,
}

impl Notification {
  pub fn error(message: impl Into<String>) -> Self {
    Self {
      level: Level::Error,
      message: message.into(),
      duration: ERROR_DURATION,
    }
  }

  pub fn warning(message: impl Into<String>) -> Self {
    Self {
      level: Level::Warning,
      message: message.into(),
      duration: WARNING_DURATION,
    }
  }
}

pub trait Notifier: Send + Sync {
  fn notify(&self, notification: Notification);
}

pub trait Navigator: Send + Sync {
  fn redirect(&self, route: Route);
}

/// Notifier that writes every notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  fn notify(&self, notification: Notification) {
    let visible_ms = notification.duration.as_millis() as u64;
    match notification.level {
      Level::Warning => tracing::warn!(visible_ms, "{}", notification.message),
      Level::Error => tracing::error!(visible_ms, "{}", notification.message),
    }
  }
}

/// Navigator for headless use: logs the redirect and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
  fn redirect(&self, route: Route) {
    tracing::info!(route = route.name(), "redirecting");
  }
}
