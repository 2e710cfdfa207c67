// src/events/request_builder.rs
//! Raw HTTP/1.1 framing for the bulk events request
//!
//! The header set, order and spelling (including `Content-length`) are what
//! the collector expects and must not change.

use crate::utils::errors::{EventsError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use tracing::debug;

/// Path accepting a JSON array of events
pub const BULK_EVENTS_PATH: &str = "/api/events/bulk";

/// Client name sent in the `User-Agent` header
pub const DEFAULT_CLIENT_NAME: &str = "RustClient";

/// Encode events as a JSON array, preserving order
pub fn encode_payload<E: Serialize>(events: &[E]) -> Result<Vec<u8>> {
    serde_json::to_vec(events)
        .map_err(|e| EventsError::SerializationFailed(format!("JSON serialization error: {}", e)))
}

/// Frames payloads into bulk-events requests
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    host: String,
    api_key: String,
    user_agent: String,
}

impl RequestBuilder {
    pub fn new(
        host: impl Into<String>,
        api_key: impl Into<String>,
        client_name: &str,
        version: &str,
    ) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            user_agent: format!("{}/{}", client_name, version),
        }
    }

    /// Build the complete request: request line, headers, blank line, payload
    pub fn build(&self, payload: &[u8]) -> Bytes {
        let head = format!(
            "POST {path} HTTP/1.1\r\n\
             Host: {host}\r\n\
             Content-Type: application/json\r\n\
             Authorization: api_key {api_key}\r\n\
             User-Agent: {user_agent}\r\n\
             Accept: application/json\r\n\
             Content-length: {length}\r\n\
             \r\n",
            path = BULK_EVENTS_PATH,
            host = self.host,
            api_key = self.api_key,
            user_agent = self.user_agent,
            length = payload.len(),
        );

        let mut request = BytesMut::with_capacity(head.len() + payload.len());
        request.put_slice(head.as_bytes());
        request.put_slice(payload);

        debug!(
            "Framed bulk request: {} header bytes, {} payload bytes",
            head.len(),
            payload.len()
        );

        request.freeze()
    }

    /// Encode `events` and frame them in one step
    pub fn build_for<E: Serialize>(&self, events: &[E]) -> Result<Bytes> {
        let payload = encode_payload(events)?;
        Ok(self.build(&payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const GOLDEN: &str = "POST /api/events/bulk HTTP/1.1\r\n\
                          Host: app.launchdarkly.com\r\n\
                          Content-Type: application/json\r\n\
                          Authorization: api_key sdk-123\r\n\
                          User-Agent: RustClient/1.2.3\r\n\
                          Accept: application/json\r\n\
                          Content-length: 26\r\n\
                          \r\n\
                          [{\"kind\":\"feature\",\"v\":1}]";

    #[test]
    fn test_golden_request() {
        let builder =
            RequestBuilder::new("app.launchdarkly.com", "sdk-123", DEFAULT_CLIENT_NAME, "1.2.3");
        let payload = br#"[{"kind":"feature","v":1}]"#;
        assert_eq!(payload.len(), 26);

        let request = builder.build(payload);
        assert_eq!(&request[..], GOLDEN.as_bytes());
    }

    #[test]
    fn test_content_length_counts_bytes() {
        let builder = RequestBuilder::new("h", "k", "Client", "0");
        let payload = "[\"héllo\"]".as_bytes();

        let request = builder.build(payload);
        let text = String::from_utf8(request.to_vec()).unwrap();
        assert!(text.contains(&format!("Content-length: {}\r\n", payload.len())));
        assert!(text.ends_with("\r\n\r\n[\"héllo\"]"));
    }

    #[test]
    fn test_payload_preserves_order() {
        let events = vec![json!({"key": "e1"}), json!({"key": "e2"}), json!({"key": "e3"})];
        let payload = encode_payload(&events).unwrap();
        assert_eq!(payload, br#"[{"key":"e1"},{"key":"e2"},{"key":"e3"}]"#.to_vec());
    }

    #[test]
    fn test_serialization_failure() {
        use std::collections::HashMap;

        // Non-string map keys cannot be encoded as JSON objects
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], 1);
        let result = encode_payload(&[bad]);
        assert!(matches!(result, Err(EventsError::SerializationFailed(_))));
    }

    #[test]
    fn test_build_for() {
        let builder = RequestBuilder::new("h", "k", "Client", "0");
        let request = builder.build_for(&[json!(1), json!(2)]).unwrap();
        assert!(request.ends_with(b"Content-length: 5\r\n\r\n[1,2]"));
        assert!(request.starts_with(b"POST /api/events/bulk HTTP/1.1\r\n"));
    }
}
