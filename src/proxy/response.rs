//! Response for a cache hit.

use crate::generator::OutputFormat;
use chrono::{DateTime, Utc};
use std::time::{Duration, SystemTime};

/// Bytes of a cached image plus the headers to send with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    /// Builds the response for `body`, last modified at `modified`.
    pub fn new(
        body: Vec<u8>,
        format: OutputFormat,
        modified: SystemTime,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        let expires = chrono::Duration::from_std(lifetime)
            .ok()
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let headers = vec![
            ("Content-Type", format.mime_type().to_string()),
            ("Content-Length", body.len().to_string()),
            ("Last-Modified", http_date(DateTime::<Utc>::from(modified))),
            ("Expires", http_date(expires)),
            ("Cache-Control", format!("public, max-age={}", lifetime.as_secs())),
            ("ETag", etag(&body)),
        ];
        Self { headers, body }
    }

    /// Looks up a header by name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Formats a timestamp as an RFC 1123 HTTP date.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Quoted MD5 of the content.
pub fn etag(body: &[u8]) -> String {
    format!("\"{:x}\"", md5::compute(body))
}
