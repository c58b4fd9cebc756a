//! Response envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::WireError;

/// Cluster response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterResponse {
    /// Protocol version (echoed from request).
    pub protocol_version: i32,
    /// Request ID echoed from the request.
    pub request_id: String,
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Success payload (present when ok=true).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Error details (present when ok=false).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl ClusterResponse {
    /// Create a success response.
    pub fn success(protocol_version: i32, request_id: String, payload: serde_json::Value) -> Self {
        Self {
            protocol_version,
            request_id,
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(protocol_version: i32, request_id: String, error: WireError) -> Self {
        Self {
            protocol_version,
            request_id,
            ok: false,
            payload: None,
            error: Some(error),
        }
    }

    /// Unwrap the envelope into the operation's response type.
    ///
    /// Error envelopes come back as their [`WireError`]; a success envelope
    /// without a decodable payload is reported as `INVALID_REQUEST`.
    pub fn into_payload<T: DeserializeOwned>(self) -> Result<T, WireError> {
        if !self.ok {
            return Err(self.error.unwrap_or_else(|| {
                WireError::invalid_request("error response without error details")
            }));
        }
        let payload = self
            .payload
            .ok_or_else(|| WireError::invalid_request("success response without payload"))?;
        serde_json::from_value(payload)
            .map_err(|e| WireError::invalid_request(format!("invalid response payload: {}", e)))
    }
}
