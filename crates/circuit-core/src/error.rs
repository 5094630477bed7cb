//! Error types for the core library.

use log::debug;
use serde_json::Value;
use thiserror::Error;

/// Core library error type.
///
/// HTTP failures split into two kinds: [`CircuitError::Client`] for 4xx
/// responses carrying a JSON body, and the generic transport errors
/// ([`CircuitError::Http`], [`CircuitError::Network`]) for everything else.
/// Callers match on the client kind to show a friendly message.
#[derive(Debug, Error)]
pub enum CircuitError {
    /// A configuration error, raised before any network call.
    #[error("configuration error: {0}")]
    Config(String),

    /// A 4xx response with a JSON content type.
    #[error("{message}")]
    Client {
        /// HTTP status code.
        status: u16,
        /// Parsed error body, `None` when the body was not valid JSON.
        payload: Option<Value>,
        /// Human-readable message built from the payload.
        message: String,
    },

    /// A non-2xx response that is not a typed client error.
    #[error("the server responded with status {status}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Content type of the response, if any.
        content_type: Option<String>,
        /// Raw response body.
        body: String,
    },

    /// Connection, timeout or TLS failure.
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// A successful response whose body does not match the endpoint schema.
    #[error("decoding {context} response: {source}")]
    Decode {
        /// What was being decoded.
        context: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A URL could not be built from the configuration.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias using `CircuitError`.
pub type Result<T> = std::result::Result<T, CircuitError>;

impl CircuitError {
    /// Build the error for a 4xx response.
    ///
    /// JSON bodies become [`CircuitError::Client`] with the payload's
    /// `errorDescription` (or the whole payload) in the message. Anything
    /// else falls back to [`CircuitError::Http`] with the raw body.
    #[must_use]
    pub fn from_client_response(status: u16, content_type: Option<&str>, body: &str) -> Self {
        let is_json = content_type.is_some_and(|ct| ct.contains("application/json"));
        if !is_json {
            return Self::Http {
                status,
                content_type: content_type.map(str::to_owned),
                body: body.to_owned(),
            };
        }

        match serde_json::from_str::<Value>(body) {
            Ok(payload) => {
                let description = payload
                    .get("errorDescription")
                    .filter(|d| !d.is_null())
                    .map_or_else(
                        || payload.to_string(),
                        |d| d.as_str().map_or_else(|| d.to_string(), str::to_owned),
                    );
                Self::Client {
                    status,
                    message: format!("server response: {description} (status: {status})"),
                    payload: Some(payload),
                }
            }
            Err(e) => {
                debug!("error body with status {status} is not valid JSON: {e}");
                Self::Client {
                    status,
                    payload: None,
                    message: format!("server response with status {status} and malformed JSON"),
                }
            }
        }
    }

    /// Check if this is the typed client error.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Client { .. })
    }

    /// Check if this is a generic transport error.
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Network(_))
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Get the HTTP status code, if the error came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Client { status, .. } | Self::Http { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: Option<&str> = Some("application/json");

    #[test]
    fn json_error_description_and_status_in_message() {
        let err = CircuitError::from_client_response(
            403,
            JSON,
            r#"{"errorCode":"FORBIDDEN","errorDescription":"bad thing"}"#,
        );
        assert!(err.is_client_error());
        let message = err.to_string();
        assert!(message.contains("bad thing"), "{message}");
        assert!(message.contains("403"), "{message}");
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn json_without_description_embeds_whole_payload() {
        let err = CircuitError::from_client_response(404, JSON, r#"{"reason":"gone"}"#);
        assert_eq!(
            err.to_string(),
            r#"server response: {"reason":"gone"} (status: 404)"#
        );
    }

    #[test]
    fn json_content_type_with_charset_is_recognized() {
        let err = CircuitError::from_client_response(
            400,
            Some("application/json; charset=utf-8"),
            r#"{"errorDescription":"missing topic"}"#,
        );
        assert!(err.is_client_error());
        assert!(err.to_string().contains("missing topic"));
    }

    #[test]
    fn malformed_json_is_still_a_client_error() {
        let err = CircuitError::from_client_response(422, JSON, "{not json");
        match err {
            CircuitError::Client {
                status,
                payload,
                message,
            } => {
                assert_eq!(status, 422);
                assert!(payload.is_none());
                assert_eq!(message, "server response with status 422 and malformed JSON");
            }
            other => panic!("expected client error, got {other:?}"),
        }
    }

    #[test]
    fn non_json_content_type_is_transport_error() {
        let err = CircuitError::from_client_response(401, Some("text/html"), "<h1>nope</h1>");
        assert!(!err.is_client_error());
        assert!(err.is_transport_error());
        match err {
            CircuitError::Http { status, body, .. } => {
                assert_eq!(status, 401);
                assert_eq!(body, "<h1>nope</h1>");
            }
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }

    #[test]
    fn missing_content_type_is_transport_error() {
        let err = CircuitError::from_client_response(400, None, r#"{"errorDescription":"x"}"#);
        assert!(err.is_transport_error());
    }

    #[test]
    fn config_error_has_no_status() {
        let err = CircuitError::Config("client_id parameter required".to_string());
        assert!(err.is_config_error());
        assert_eq!(err.status(), None);
    }
}
