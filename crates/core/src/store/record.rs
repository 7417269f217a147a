//! Cached response records.

use serde::{Deserialize, Serialize};

/// The captured status, headers, and body of a prior successful network
/// response.
///
/// Records are replaced atomically as a whole; there is no partial update
/// path. Recency is implicit: `stored_at` reflects insertion order and acts
/// as the LRU proxy, no explicit TTL is modeled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl ResponseRecord {
    /// Capture a response for storage, stamping the current time.
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self { status, headers, body, stored_at: chrono::Utc::now().to_rfc3339() }
    }

    /// Whether the captured status is in the success range.
    ///
    /// Only successful records may enter a store; redirects and failures
    /// are never cached.
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(ResponseRecord::new(200, vec![], vec![]).is_success());
        assert!(ResponseRecord::new(204, vec![], vec![]).is_success());
        assert!(!ResponseRecord::new(301, vec![], vec![]).is_success());
        assert!(!ResponseRecord::new(404, vec![], vec![]).is_success());
        assert!(!ResponseRecord::new(500, vec![], vec![]).is_success());
    }

    #[test]
    fn test_header_lookup() {
        let record = ResponseRecord::new(
            200,
            vec![("Content-Type".to_string(), "text/html".to_string())],
            b"<html></html>".to_vec(),
        );
        assert_eq!(record.header("content-type"), Some("text/html"));
        assert_eq!(record.header("etag"), None);
    }
}
