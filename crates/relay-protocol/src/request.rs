//! Request envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::WireError;

/// Cluster request envelope.
///
/// Every master/worker round trip carries exactly one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterRequest {
    /// Protocol version of the sender.
    pub protocol_version: i32,
    /// Operation name (see [`crate::ops::names`]).
    pub op: String,
    /// Caller-chosen request ID for correlation.
    pub request_id: String,
    /// Operation-specific payload.
    pub payload: serde_json::Value,
}

impl ClusterRequest {
    /// Build a request for `op` with a typed payload.
    pub fn new<T: Serialize>(
        op: &str,
        request_id: impl Into<String>,
        payload: &T,
    ) -> Result<Self, WireError> {
        let payload = serde_json::to_value(payload)
            .map_err(|e| WireError::invalid_request(format!("unserializable payload: {}", e)))?;
        Ok(Self {
            protocol_version: crate::PROTOCOL_VERSION,
            op: op.to_string(),
            request_id: request_id.into(),
            payload,
        })
    }

    /// Decode the payload into the operation's request type.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, WireError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            WireError::invalid_request(format!("invalid {} payload: {}", self.op, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{names, ClaimRequest};

    #[test]
    fn test_payload_round_trip() {
        let claim = ClaimRequest {
            key: "abc".to_string(),
            file_path: "a.css".to_string(),
        };
        let request = ClusterRequest::new(names::CLAIM, "req-1", &claim).unwrap();
        assert_eq!(request.protocol_version, crate::PROTOCOL_VERSION);
        let decoded: ClaimRequest = request.decode_payload().unwrap();
        assert_eq!(decoded, claim);
    }

    #[test]
    fn test_decode_wrong_shape_is_invalid_request() {
        let request = ClusterRequest {
            protocol_version: 1,
            op: names::CLAIM.to_string(),
            request_id: "req-2".to_string(),
            payload: serde_json::json!({"nope": true}),
        };
        let err = request.decode_payload::<ClaimRequest>().unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::InvalidRequest);
        assert!(err.message.contains("claim"));
    }
}
