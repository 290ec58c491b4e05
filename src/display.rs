//! Terminal rendering of responses.
//!
//! Three modes: the default `Status:`/`Url:` block followed by the body
//! (headers included on request), body only, and metadata only. JSON
//! bodies are pretty-printed with 2-space indent and sorted keys; other
//! bodies print as UTF-8 text with invalid sequences replaced.

use crate::models::response::HttpResponse;
use serde_json::Value;
use std::collections::BTreeMap;

/// How a response is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Status and URL lines, optional headers, blank line, body
    Default { headers: bool },

    /// The body, nothing else (`-R`)
    BodyOnly,

    /// Status, URL, and headers, no body (`-I`)
    MetadataOnly,
}

/// Renders a response according to the display mode.
pub fn render_response(response: &HttpResponse, mode: DisplayMode) -> String {
    match mode {
        DisplayMode::BodyOnly => render_body(response),
        DisplayMode::MetadataOnly => render_metadata(response, true),
        DisplayMode::Default { headers } => {
            let mut out = render_metadata(response, headers);
            out.push('\n');
            out.push_str(&render_body(response));
            out
        }
    }
}

fn render_metadata(response: &HttpResponse, headers: bool) -> String {
    let mut out = format!("Status: {}\nUrl: {}\n", response.status_code, response.url);
    if headers {
        out.push_str(&format!("Headers: {}\n", pretty_headers(response)));
    }
    out
}

/// The response body, pretty-printed when it is JSON.
///
/// A JSON content type with an unparsable body falls back to raw text.
fn render_body(response: &HttpResponse) -> String {
    if response.is_json() {
        if let Some(value) = response.body_json() {
            return pretty_json(&value);
        }
    }
    response.body_text()
}

/// The headers map as pretty JSON with sorted keys.
fn pretty_headers(response: &HttpResponse) -> String {
    let sorted: BTreeMap<&String, &String> = response.headers.iter().collect();
    serde_json::to_string_pretty(&sorted).unwrap_or_else(|_| "{}".to_string())
}

/// Pretty JSON with 2-space indent; object keys sort via `BTreeMap`.
fn pretty_json(value: &Value) -> String {
    let sorted = sort_keys(value);
    serde_json::to_string_pretty(&sorted).unwrap_or_else(|_| value.to_string())
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, sort_keys(v))).collect();
            serde_json::to_value(sorted).unwrap_or_else(|_| value.clone())
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}
