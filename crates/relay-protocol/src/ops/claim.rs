//! Claim and publish operation types.
//!
//! A worker asks the master whether a dedup key already has a published
//! value (`claim`), and reports a freshly computed value back (`publish`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Claim request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRequest {
    /// Dedup key (content-and-options digest).
    pub key: String,
    /// File the key was computed for.
    pub file_path: String,
}

/// Claim response payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimResponse {
    /// Whether a value has been published for the key.
    pub found: bool,
    /// The published value (present when found=true).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ClaimResponse {
    /// Response for a key nobody has published yet.
    pub fn unresolved() -> Self {
        Self::default()
    }

    /// Response carrying a published value.
    pub fn resolved(value: Value) -> Self {
        Self {
            found: true,
            value: Some(value),
        }
    }
}

/// Publish request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Dedup key the value resolves.
    pub key: String,
    /// File the key was computed for.
    pub file_path: String,
    /// Computed plugin output.
    pub value: Value,
}

/// Publish response payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResponse {
    /// False when an earlier publish already resolved the key.
    pub accepted: bool,
}
