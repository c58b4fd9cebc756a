//! Dispatch operation types.
//!
//! Sent by the master to a worker to run one plugin step against one file.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Dispatch request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// Plugin chain the step belongs to.
    #[serde(rename = "type")]
    pub kind: String,
    /// Position of the plugin within that chain.
    pub plugin_index: usize,
    /// Path of the file to process.
    pub file_path: String,
}

/// Dispatch response payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchResponse {
    /// Raw plugin output, absent when the plugin produced nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}
