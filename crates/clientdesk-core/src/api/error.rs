use std::fmt;

use serde_json::Value;

/// Categories of API errors for consistent error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Non-2xx status from the service
    HttpStatus,
    /// Connection timeout or request timeout
    Timeout,
    /// DNS, connection refused, TLS, or any other failure before a status arrived
    Transport,
    /// Response body could not be read or decoded
    Parse,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::HttpStatus => write!(f, "http_status"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::Transport => write!(f, "transport"),
            ApiErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Structured error from the API client.
///
/// `status` is present only when the service answered.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub status: Option<u16>,
    /// One-line summary suitable for logs
    pub message: String,
    /// Raw response body or underlying cause
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an HTTP status error, keeping the body as details.
    pub fn http_status(status: u16, body: &str) -> Self {
        let mut message = format!("HTTP {status}");
        if let Ok(json) = serde_json::from_str::<Value>(body)
            && let Some(msg) = server_message(&json)
        {
            message = format!("HTTP {status}: {msg}");
        }
        Self {
            kind: ApiErrorKind::HttpStatus,
            status: Some(status),
            message,
            details: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    /// Classifies a transport failure from reqwest.
    pub fn transport(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ApiErrorKind::Timeout
        } else {
            ApiErrorKind::Transport
        };
        Self {
            kind,
            status: None,
            message: format!("Network error: {err}"),
            details: std::error::Error::source(err).map(ToString::to_string),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    /// The raw response body, when the service sent one.
    pub fn body(&self) -> Option<&str> {
        match self.kind {
            ApiErrorKind::HttpStatus => self.details.as_deref(),
            _ => None,
        }
    }
}

/// Pulls a message out of the common `{"message": ..}` / `{"error": ..}` bodies.
fn server_message(json: &Value) -> Option<&str> {
    json.get("message")
        .and_then(Value::as_str)
        .or_else(|| json.get("error").and_then(Value::as_str))
        .or_else(|| {
            json.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
        })
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_extracts_server_message() {
        let err = ApiError::http_status(401, r#"{"message":"Invalid credentials"}"#);
        assert_eq!(err.kind, ApiErrorKind::HttpStatus);
        assert_eq!(err.status, Some(401));
        assert_eq!(err.message, "HTTP 401: Invalid credentials");
        assert_eq!(err.body(), Some(r#"{"message":"Invalid credentials"}"#));

        let nested = ApiError::http_status(500, r#"{"error":{"message":"boom"}}"#);
        assert_eq!(nested.message, "HTTP 500: boom");
    }

    #[test]
    fn test_http_status_with_plain_or_empty_body() {
        let plain = ApiError::http_status(502, "Bad Gateway");
        assert_eq!(plain.message, "HTTP 502");
        assert_eq!(plain.body(), Some("Bad Gateway"));

        let empty = ApiError::http_status(404, "");
        assert_eq!(empty.body(), None);
    }

    #[test]
    fn test_parse_error_has_no_status() {
        let err = ApiError::parse("bad json");
        assert_eq!(err.status, None);
        assert_eq!(err.body(), None);
        assert_eq!(err.to_string(), "bad json");
    }
}
