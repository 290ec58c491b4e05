//! HTTP dispatch over reqwest.
//!
//! One request per process: a client is built from the request's own
//! timeout, redirect, and TLS settings, the call is made, and the
//! response is captured into [`HttpResponse`]. Transport failures map
//! into [`RequestError`].

pub mod error;

pub use error::RequestError;

use crate::models::request::Request;
use crate::models::response::HttpResponse;
use crate::variables::substitution::value_to_text;
use log::debug;
use reqwest::redirect::Policy;
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use url::Url;

/// Maximum redirects followed when `allow_redirects` is set.
const REDIRECT_LIMIT: usize = 10;

/// Validates that a URL parses and uses the http or https scheme.
pub fn validate_url(url: &str) -> Result<(), RequestError> {
    let parsed = Url::parse(url)?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(RequestError::UnsupportedProtocol(other.to_string())),
    }
}

/// Sends one HTTP request and captures the response.
///
/// `name`, `post_script`, and passthrough fields never reach the wire.
pub async fn send(request: &Request) -> Result<HttpResponse, RequestError> {
    validate_url(&request.url)?;

    let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
        .map_err(|_| RequestError::BuildError(format!("Invalid HTTP method: {}", request.method)))?;

    let redirect_policy = if request.allow_redirects {
        Policy::limited(REDIRECT_LIMIT)
    } else {
        Policy::none()
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(request.timeout))
        .redirect(redirect_policy)
        .danger_accept_invalid_certs(!request.verify)
        .build()?;

    let mut builder = client.request(method, &request.url);

    let query = stringify_pairs(&request.params);
    if !query.is_empty() {
        builder = builder.query(&query);
    }

    for (name, value) in stringify_pairs(&request.headers) {
        builder = builder.header(name, value);
    }

    if !request.cookies.is_empty() {
        builder = builder.header("Cookie", cookie_header(&request.cookies));
    }

    if let Some(body) = &request.body {
        builder = match body {
            Value::String(text) => builder.body(text.clone()),
            Value::Object(map) => {
                let form: Vec<(String, String)> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), value_to_text(v).unwrap_or_default()))
                    .collect();
                builder.form(&form)
            }
            other => builder.body(other.to_string()),
        };
    }

    debug!("Sending {} {}", request.method, request.url);
    let start = Instant::now();
    let response = builder.send().await?;

    let status_code = response.status().as_u16();
    let status_text = response
        .status()
        .canonical_reason()
        .unwrap_or("Unknown")
        .to_string();
    let final_url = response.url().to_string();

    let mut headers = HashMap::new();
    for (name, value) in response.headers() {
        if let Ok(value) = value.to_str() {
            headers.insert(name.as_str().to_string(), value.to_string());
        }
    }

    let body = response.bytes().await?.to_vec();
    let duration = start.elapsed();
    debug!(
        "Received {} from {} in {:?} ({} bytes)",
        status_code,
        final_url,
        duration,
        body.len()
    );

    Ok(HttpResponse {
        status_code,
        status_text,
        url: final_url,
        headers,
        body,
        duration,
    })
}

/// Stringifies a value map into wire-ready pairs.
///
/// Unset values (null, empty string) become empty strings rather than
/// being dropped, so a deliberately blank parameter still appears.
fn stringify_pairs(map: &BTreeMap<String, Value>) -> Vec<(String, String)> {
    map.iter()
        .map(|(k, v)| (k.clone(), value_to_text(v).unwrap_or_default()))
        .collect()
}

/// Assembles a `Cookie` header value from the cookie map.
fn cookie_header(cookies: &BTreeMap<String, Value>) -> String {
    cookies
        .iter()
        .map(|(k, v)| format!("{}={}", k, value_to_text(v).unwrap_or_default()))
        .collect::<Vec<_>>()
        .join("; ")
}
