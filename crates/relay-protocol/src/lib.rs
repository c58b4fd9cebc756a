//! Relay Protocol Types
//!
//! Defines the JSON envelope exchanged between the master process and its
//! workers: plugin dispatch from master to worker, and the claim/publish
//! handshake from worker to master.

pub mod error;
pub mod request;
pub mod response;
pub mod ops;

pub use error::{ErrorCode, WireError};
pub use request::ClusterRequest;
pub use response::ClusterResponse;

/// Protocol version spoken by this implementation.
pub const PROTOCOL_VERSION: i32 = 1;
