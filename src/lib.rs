//! Client data layer of the disease-detection admin console.
//!
//! - [`api`]: HTTP client with bearer auth and coalesced token refresh
//! - [`cache`]: time-bounded cache of the resource lists
//! - [`session`]: the signed-in user's identity
//! - [`storage`]: persisted credentials and preferences

pub mod api;
pub mod cache;
pub mod config;
pub mod detail;
pub mod logging;
pub mod notify;
pub mod routes;
pub mod session;
pub mod sidebar;
pub mod storage;

#[cfg(test)]
mod test_support;
