//! Upstream data API
//!
//! The `UpstreamApi` trait is the transport seam used by the orchestrator;
//! `HttpUpstream` is the reqwest implementation. Transports return the raw
//! response body and the envelope is checked here, independent of transport.

mod http;

pub use http::HttpUpstream;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::auth::BearerToken;
use crate::error::UpstreamError;

/// Issues authenticated GET requests against the upstream API
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Fetches `path` with the bearer credential and returns the body of a
    /// successful (2xx) response
    ///
    /// A refused credential must be reported as `UpstreamError::Unauthorized`.
    async fn get(&self, path: &str, bearer: &BearerToken) -> Result<Value, UpstreamError>;
}

/// The upstream wrapper indicating logical success
#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Validates the envelope and extracts its payload
///
/// A `success: false` envelope is a failure even on a 200 response.
pub fn unwrap_envelope(body: Value) -> Result<Value, UpstreamError> {
    let envelope: Envelope =
        serde_json::from_value(body).map_err(|e| UpstreamError::Malformed(e.to_string()))?;

    if !envelope.success {
        return Err(UpstreamError::Rejected(
            envelope
                .message
                .unwrap_or_else(|| "request unsuccessful".to_string()),
        ));
    }

    // A successful envelope with null or absent data is a valid, empty answer
    Ok(envelope.data.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_successful_envelope_yields_data() {
        let payload = unwrap_envelope(json!({
            "success": true,
            "data": [{ "id": 2, "name": "TURKIYE" }],
            "message": null
        }))
        .unwrap();

        assert_eq!(payload, json!([{ "id": 2, "name": "TURKIYE" }]));
    }

    #[test]
    fn test_unsuccessful_envelope_is_failure() {
        let err = unwrap_envelope(json!({
            "success": false,
            "data": null,
            "message": "Rate limit exceeded"
        }))
        .unwrap_err();

        assert_eq!(err, UpstreamError::Rejected("Rate limit exceeded".to_string()));
    }

    #[test]
    fn test_unsuccessful_envelope_without_message() {
        let err = unwrap_envelope(json!({ "success": false })).unwrap_err();
        assert!(matches!(err, UpstreamError::Rejected(_)));
    }

    #[test]
    fn test_missing_success_flag_is_malformed() {
        let err = unwrap_envelope(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed(_)));

        let err = unwrap_envelope(json!({ "data": [] })).unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed(_)));
    }

    #[test]
    fn test_success_without_data_yields_null() {
        let payload = unwrap_envelope(json!({ "success": true, "data": null })).unwrap();
        assert_eq!(payload, Value::Null);

        let payload = unwrap_envelope(json!({ "success": true, "message": null })).unwrap();
        assert_eq!(payload, Value::Null);
    }
}
