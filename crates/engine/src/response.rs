//! Responses served back across the interception boundary, including the
//! generated substitutes used when every other option is exhausted.

use bytes::Bytes;

use sevacache_core::ResponseRecord;

use crate::transport::NetworkResponse;

/// Marks generated substitute responses so callers can tell real content
/// from fallbacks.
pub const SUBSTITUTE_HEADER: &str = "x-cache-substitute";

/// Minimal inline image returned when an image cannot be fetched or found.
const PLACEHOLDER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" width="24" height="24"><rect width="24" height="24" fill="#e2e2e2"/><path d="M5 17l4-5 3 3 3-4 4 6z" fill="#b0b0b0"/></svg>"##;

/// What the interceptor hands back to the caller. Every failure path ends
/// in one of these; nothing throws past the boundary.
#[derive(Debug, Clone)]
pub struct ServedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ServedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether this is a generated substitute rather than real content.
    pub fn is_substitute(&self) -> bool {
        self.header(SUBSTITUTE_HEADER).is_some()
    }
}

impl From<ResponseRecord> for ServedResponse {
    fn from(record: ResponseRecord) -> Self {
        Self { status: record.status, headers: record.headers, body: Bytes::from(record.body) }
    }
}

impl From<NetworkResponse> for ServedResponse {
    fn from(resp: NetworkResponse) -> Self {
        Self { status: resp.status, headers: resp.headers, body: resp.body }
    }
}

/// Generated placeholder for image requests that cannot be satisfied.
///
/// 203 keeps it success-class (it is content, not an error) while still
/// marking the response as non-authoritative; it is never written to a
/// store.
pub fn placeholder_image() -> ServedResponse {
    ServedResponse {
        status: 203,
        headers: vec![
            ("content-type".to_string(), "image/svg+xml".to_string()),
            (SUBSTITUTE_HEADER.to_string(), "placeholder".to_string()),
        ],
        body: Bytes::from_static(PLACEHOLDER_SVG.as_bytes()),
    }
}

/// Structured service-unavailable response carrying an explicit offline
/// indicator.
pub fn offline_response() -> ServedResponse {
    let body = serde_json::json!({
        "error": "offline",
        "offline": true,
    });
    ServedResponse {
        status: 503,
        headers: vec![
            ("content-type".to_string(), "application/json".to_string()),
            (SUBSTITUTE_HEADER.to_string(), "offline".to_string()),
        ],
        body: Bytes::from(body.to_string()),
    }
}

/// Generic failure tail for the default strategy's fallback chain.
pub fn generic_unavailable() -> ServedResponse {
    ServedResponse {
        status: 503,
        headers: vec![
            ("content-type".to_string(), "text/plain".to_string()),
            (SUBSTITUTE_HEADER.to_string(), "unavailable".to_string()),
        ],
        body: Bytes::from_static(b"service unavailable"),
    }
}
