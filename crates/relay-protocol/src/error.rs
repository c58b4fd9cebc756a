//! Error types for the cluster protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes returned in cluster error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed envelope, missing fields, or unsupported protocol version.
    InvalidRequest,
    /// Unknown operation requested.
    UnknownOperation,
    /// No plugin is registered at the requested chain position.
    UnknownPlugin,
    /// The target file could not be read.
    FileUnavailable,
    /// The plugin itself failed while running.
    PluginFailed,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "INVALID_REQUEST"),
            Self::UnknownOperation => write!(f, "UNKNOWN_OPERATION"),
            Self::UnknownPlugin => write!(f, "UNKNOWN_PLUGIN"),
            Self::FileUnavailable => write!(f, "FILE_UNAVAILABLE"),
            Self::PluginFailed => write!(f, "PLUGIN_FAILED"),
        }
    }
}

/// Error payload carried by a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct WireError {
    /// Error code from the registry.
    pub code: ErrorCode,
    /// Human-readable, single-line error message.
    pub message: String,
    /// Optional machine-readable details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl WireError {
    /// Create a new wire error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a new wire error with additional data.
    pub fn with_data(code: ErrorCode, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create an INVALID_REQUEST error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Create an INVALID_REQUEST error for a protocol version mismatch.
    pub fn unsupported_protocol(version: i32, supported: i32) -> Self {
        Self::with_data(
            ErrorCode::InvalidRequest,
            format!("protocol_version {} is not supported (expected {})", version, supported),
            serde_json::json!({ "requested": version, "supported": supported }),
        )
    }

    /// Create an UNKNOWN_OPERATION error.
    pub fn unknown_operation(op: &str) -> Self {
        Self::with_data(
            ErrorCode::UnknownOperation,
            format!("unknown operation: {}", op),
            serde_json::json!({ "op": op }),
        )
    }

    /// Create an UNKNOWN_PLUGIN error.
    pub fn unknown_plugin(kind: &str, plugin_index: usize) -> Self {
        Self::with_data(
            ErrorCode::UnknownPlugin,
            format!("no plugin at position {} of chain '{}'", plugin_index, kind),
            serde_json::json!({ "type": kind, "plugin_index": plugin_index }),
        )
    }

    /// Create a FILE_UNAVAILABLE error.
    pub fn file_unavailable(file_path: &str, reason: impl fmt::Display) -> Self {
        Self::with_data(
            ErrorCode::FileUnavailable,
            format!("file '{}' is unavailable: {}", file_path, reason),
            serde_json::json!({ "file_path": file_path }),
        )
    }

    /// Create a PLUGIN_FAILED error.
    pub fn plugin_failed(plugin: &str, file_path: &str, reason: impl fmt::Display) -> Self {
        Self::with_data(
            ErrorCode::PluginFailed,
            format!("plugin '{}' failed on '{}': {}", plugin, file_path, reason),
            serde_json::json!({ "plugin": plugin, "file_path": file_path }),
        )
    }
}
