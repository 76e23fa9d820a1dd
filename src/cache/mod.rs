//! In-memory cache of the console's resource lists.
//!
//! Each resource kind keeps the last page it fetched for a few minutes:
//! - Repeat fetches inside the window are answered without a network call
//! - Forced fetches and stale or empty collections always go to the network
//! - Failed fetches never overwrite what is already cached
//! - User and operation lists are refused locally for non-privileged roles

mod collection;
mod store;
mod traits;

pub use collection::CachedCollection;
pub use store::ResourceStore;
pub use traits::{ListError, ListPage, ListScope, Resource, ResourceKind, KINDS};
