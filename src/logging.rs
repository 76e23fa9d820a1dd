use std::path::Path;
use std::sync::OnceLock;

use tracing_subscriber::prelude::*;

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Install the global subscriber: stderr plus a daily rolling file in `log_dir`.
///
/// `RUST_LOG` narrows or widens the default `info` level. Calling this twice
/// leaves the first subscriber in place.
pub fn init(log_dir: &Path) {
  // Best effort; the stderr layer still works without the file
  let _ = std::fs::create_dir_all(log_dir);

  let file_appender = tracing_appender::rolling::daily(log_dir, "detectdesk.log");
  let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
  let _ = LOG_GUARD.set(guard);

  let env_filter = tracing_subscriber::EnvFilter::builder()
    .with_default_directive(tracing::Level::INFO.into())
    .from_env_lossy();

  // stdout carries command output
  let stderr_layer = tracing_subscriber::fmt::layer()
    .with_writer(std::io::stderr)
    .with_target(false)
    .with_ansi(cfg!(debug_assertions));

  let file_layer = tracing_subscriber::fmt::layer()
    .with_writer(non_blocking)
    .with_ansi(false);

  let subscriber = tracing_subscriber::registry()
    .with(env_filter)
    .with(stderr_layer)
    .with(file_layer);

  let _ = tracing::subscriber::set_global_default(subscriber);
}
