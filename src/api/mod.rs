//! Client for the console backend.
//!
//! - `transport`: wire types and the pluggable HTTP transport
//! - `client`: bearer auth, 401 interception, coalesced token refresh
//! - `api_types`: response shapes and the tagged business outcome
//! - `types`: domain types shared with the cache and session stores

pub mod api_types;
pub mod cache;
pub mod client;
mod error;
pub mod refresh;
pub mod transport;
pub mod types;

pub use api_types::{ApiOutcome, ListResponse};
pub use client::ApiClient;
pub use error::ApiError;
pub use transport::{ApiRequest, RawResponse, ReqwestTransport, Transport, TransportError};
pub use types::{Detection, Media, Model, Operation, PageRequest, Role, Session, User};
