use color_eyre::Result;
use std::sync::Arc;

use crate::storage::{ClientStorage, SIDEBAR_COLLAPSED};

/// Collapsed/expanded state of the navigation sidebar, persisted across runs
pub struct SidebarState {
  storage: Arc<dyn ClientStorage>,
  collapsed: bool,
}

impl SidebarState {
  /// Only the literal "true" means collapsed; anything else, or nothing, is expanded.
  pub fn load(storage: Arc<dyn ClientStorage>) -> Result<Self> {
    let collapsed = storage.get(SIDEBAR_COLLAPSED)?.as_deref() == Some("true");
    Ok(Self { storage, collapsed })
  }

  pub fn is_collapsed(&self) -> bool {
    self.collapsed
  }

  /// Flip the state and persist it.
  pub fn toggle(&mut self) -> Result<bool> {
    self.collapsed = !self.collapsed;
    self
      .storage
      .set(SIDEBAR_COLLAPSED, if self.collapsed { "true" } else { "false" })?;
    Ok(self.collapsed)
  }
}
