//! Response descriptor returned by the HTTP executor.

use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// An HTTP response as captured by the executor.
///
/// Holds everything the display layer and the post-script machinery need:
/// status, the final URL after redirects, headers, and the raw body bytes.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code (e.g. 200, 404)
    pub status_code: u16,

    /// Human-readable status text (e.g. "OK", "Not Found")
    pub status_text: String,

    /// Final URL, after any redirects were followed
    pub url: String,

    /// Response headers
    pub headers: HashMap<String, String>,

    /// Raw response body
    pub body: Vec<u8>,

    /// Total request duration
    pub duration: Duration,
}

impl HttpResponse {
    /// Creates an empty response with the given status, mainly for tests.
    pub fn new(status_code: u16, status_text: impl Into<String>) -> Self {
        Self {
            status_code,
            status_text: status_text.into(),
            url: String::new(),
            headers: HashMap::new(),
            body: Vec::new(),
            duration: Duration::from_secs(0),
        }
    }

    /// Looks up a header value, matching the name case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `Content-Type` header value, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Whether the response declares a JSON content type.
    pub fn is_json(&self) -> bool {
        self.content_type()
            .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false)
    }

    /// The body decoded as UTF-8 text, with invalid sequences replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The body parsed as JSON, if it parses.
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}
