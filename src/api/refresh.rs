//! Coalescing of access-token refreshes.
//!
//! Any number of requests may hit a 401 at the same time, but only one of
//! them gets to call the refresh endpoint. The rest park themselves in a FIFO
//! queue attached to the `Refreshing` state and are replayed once the new
//! token is known.

use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::oneshot;

use super::transport::ApiRequest;
use super::ApiError;

/// Reply channel for a parked request
pub type ReplySender = oneshot::Sender<Result<Value, ApiError>>;
pub type ReplyReceiver = oneshot::Receiver<Result<Value, ApiError>>;

/// A request waiting for the refresh to finish.
#[derive(Debug)]
pub struct PendingReplay {
  pub request: ApiRequest,
  pub reply: ReplySender,
}

#[derive(Debug, Default)]
enum RefreshState {
  #[default]
  Idle,
  Refreshing { queue: VecDeque<PendingReplay> },
}

/// Outcome of trying to start a refresh.
#[derive(Debug)]
pub enum Begin<'a> {
  /// The caller won the Idle -> Refreshing transition and must perform the
  /// refresh, then call [`LeaderGuard::finish`]. The request is handed back
  /// for the caller to replay itself.
  Leader(ApiRequest, LeaderGuard<'a>),
  /// A refresh is already running; wait here for the replayed response.
  Queued(ReplyReceiver),
}

#[derive(Debug, Default)]
pub struct RefreshCoordinator {
  state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start a refresh, or queue `request` behind the one already running.
  pub fn begin(&self, request: ApiRequest) -> Result<Begin<'_>> {
    let mut state = self
      .state
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    if let RefreshState::Refreshing { queue } = &mut *state {
      let (reply, rx) = oneshot::channel();
      queue.push_back(PendingReplay { request, reply });
      tracing::debug!(queued = queue.len(), "request parked behind token refresh");
      return Ok(Begin::Queued(rx));
    }

    *state = RefreshState::Refreshing {
      queue: VecDeque::new(),
    };
    Ok(Begin::Leader(
      request,
      LeaderGuard {
        coordinator: self,
        finished: false,
      },
    ))
  }

  pub fn is_refreshing(&self) -> bool {
    self
      .state
      .lock()
      .map(|state| matches!(*state, RefreshState::Refreshing { .. }))
      .unwrap_or(false)
  }

  /// Detaching the queue and resetting the state happen under one lock, so
  /// no request can join a queue after it has been drained.
  fn reset(&self) -> Result<VecDeque<PendingReplay>> {
    let mut state = self
      .state
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    match std::mem::take(&mut *state) {
      RefreshState::Idle => Ok(VecDeque::new()),
      RefreshState::Refreshing { queue } => Ok(queue),
    }
  }
}

/// Proof of leadership over the current refresh cycle.
///
/// Dropping it without calling `finish` (the leader's future was cancelled)
/// still returns the coordinator to Idle; queued requests then see their
/// reply channel close instead of waiting forever.
#[derive(Debug)]
pub struct LeaderGuard<'a> {
  coordinator: &'a RefreshCoordinator,
  finished: bool,
}

impl LeaderGuard<'_> {
  /// Return to Idle and hand back everything that queued up, oldest first.
  pub fn finish(mut self) -> Result<VecDeque<PendingReplay>> {
    self.finished = true;
    self.coordinator.reset()
  }
}

impl Drop for LeaderGuard<'_> {
  fn drop(&mut self) {
    if self.finished {
      return;
    }
    if let Ok(abandoned) = self.coordinator.reset() {
      tracing::warn!(queued = abandoned.len(), "token refresh abandoned");
    }
  }
}
