//! Transport error taxonomy for HTTP dispatch.

use std::fmt;

/// Errors that can occur while sending an HTTP request.
#[derive(Debug)]
pub enum RequestError {
    /// Connection failure, DNS failure, or other network-level problem
    NetworkError(String),

    /// The request exceeded its configured timeout
    Timeout,

    /// The request URL could not be parsed
    InvalidUrl(String),

    /// Certificate validation or TLS handshake failure
    TlsError(String),

    /// The request could not be constructed from its field values
    BuildError(String),

    /// URL scheme other than http or https
    UnsupportedProtocol(String),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            RequestError::Timeout => write!(f, "Request timed out"),
            RequestError::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            RequestError::TlsError(msg) => write!(f, "TLS error: {}", msg),
            RequestError::BuildError(msg) => write!(f, "Request build error: {}", msg),
            RequestError::UnsupportedProtocol(scheme) => {
                write!(f, "Unsupported protocol: {}", scheme)
            }
        }
    }
}

impl std::error::Error for RequestError {}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RequestError::Timeout
        } else if err.is_builder() {
            RequestError::BuildError(err.to_string())
        } else if err.is_connect() {
            let text = err.to_string();
            if text.contains("certificate") || text.contains("TLS") || text.contains("SSL") {
                RequestError::TlsError(text)
            } else {
                RequestError::NetworkError(text)
            }
        } else {
            RequestError::NetworkError(err.to_string())
        }
    }
}

impl From<url::ParseError> for RequestError {
    fn from(err: url::ParseError) -> Self {
        RequestError::InvalidUrl(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            RequestError::NetworkError("connection refused".to_string()).to_string(),
            "Network error: connection refused"
        );
        assert_eq!(RequestError::Timeout.to_string(), "Request timed out");
        assert_eq!(
            RequestError::UnsupportedProtocol("ftp".to_string()).to_string(),
            "Unsupported protocol: ftp"
        );
    }

    #[test]
    fn test_from_url_parse_error() {
        let err: RequestError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, RequestError::InvalidUrl(_)));
    }
}
