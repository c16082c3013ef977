//! Error types for prompt relaying and image generation.

/// Errors that can occur while composing, relaying or generating images.
#[derive(Debug, thiserror::Error)]
pub enum GenRelayError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The generation provider rejected the request.
    ///
    /// `body` is the provider's error payload, kept verbatim so it can be
    /// relayed to the caller untouched.
    #[error("provider error: {status} - {body}")]
    Provider {
        /// HTTP status the provider answered with.
        status: u16,
        /// The provider's `error` member, or its whole body.
        body: serde_json::Value,
    },

    /// A non-provider HTTP peer (relay server, download host) returned an error.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status of the response.
        status: u16,
        /// Error text from the peer.
        message: String,
    },

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Uploaded files cannot be stored because blob storage is unavailable.
    #[error("upload storage not configured: {0}")]
    StorageNotConfigured(String),

    /// The peer answered with something we could not interpret.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (e.g., saving a download or the history file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenRelayError {
    /// Returns true if the error was caused by the caller's input rather than
    /// by a peer or the environment.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}

/// Extracts a human-readable message from a relayed `{ error }` payload.
///
/// Providers send either a plain string or an object carrying `message`.
pub fn error_message(body: &serde_json::Value) -> String {
    match body {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) => map
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        other => other.to_string(),
    }
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, GenRelayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_validation() {
        assert!(GenRelayError::InvalidRequest("missing prompt".into()).is_validation());
        assert!(!GenRelayError::UnexpectedResponse("html".into()).is_validation());
        assert!(!GenRelayError::StorageNotConfigured("no blob".into()).is_validation());
    }

    #[test]
    fn test_error_display() {
        let err = GenRelayError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = GenRelayError::Provider {
            status: 401,
            body: json!("bad key"),
        };
        assert_eq!(err.to_string(), "provider error: 401 - \"bad key\"");
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(error_message(&json!("plain")), "plain");
        assert_eq!(
            error_message(&json!({"code": "AuthenticationError", "message": "invalid key"})),
            "invalid key"
        );
        assert_eq!(error_message(&json!({"code": 7})), r#"{"code":7}"#);
    }
}
