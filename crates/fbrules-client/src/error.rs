//! Rules client error types.

use thiserror::Error;

/// Result type for rules operations.
pub type RulesResult<T> = Result<T, RulesError>;

/// Errors raised by the Database Rules and Firebase Rules clients.
#[derive(Debug, Error)]
pub enum RulesError {
    /// Missing or invalid configuration; raised before any network call.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend rejected the call or could not be reached.
    #[error("{message}")]
    ApiCall {
        message: String,
        #[source]
        source: TransportError,
    },

    /// A successful response did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RulesError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, RulesError::Config(_))
    }

    /// The underlying transport error of a failed API call.
    pub fn detail(&self) -> Option<&TransportError> {
        match self {
            RulesError::ApiCall { source, .. } => Some(source),
            _ => None,
        }
    }

    /// HTTP status of a failed API call, if the backend responded.
    pub fn http_status(&self) -> Option<u16> {
        self.detail().and_then(TransportError::status)
    }
}

/// Errors produced while issuing a single HTTP call.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransportError {
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// HTTP status code when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_api_call_error_keeps_cause() {
        let err = RulesError::ApiCall {
            message: "Release \"live\": The specified entity could not be found.".to_string(),
            source: TransportError::Status {
                status: 404,
                body: "{}".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Release \"live\": The specified entity could not be found."
        );
        assert_eq!(err.http_status(), Some(404));
        assert!(err.source().is_some());
        assert!(matches!(
            err.detail(),
            Some(TransportError::Status { status: 404, .. })
        ));
    }

    #[test]
    fn test_config_error_has_no_status() {
        let err = RulesError::config_error("Project ID is required");
        assert!(err.is_config_error());
        assert_eq!(err.http_status(), None);
        assert!(err.detail().is_none());
    }

    #[test]
    fn test_transport_status_getter() {
        assert_eq!(TransportError::auth("expired").status(), None);
        assert_eq!(
            TransportError::Status {
                status: 503,
                body: String::new()
            }
            .status(),
            Some(503)
        );
    }
}
