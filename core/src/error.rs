//! Error types for the API client.
//!
//! # Design
//! Every transport and application failure ends up as an `ApiError`. The
//! variants keep enough structure for logging and tests, but presentation
//! code only needs `ApiError::message`, which applies the precedence rule:
//! server-supplied `msg`, then the transport message, then a generic
//! fallback.

use std::collections::BTreeMap;

use thiserror::Error;

/// Message used when neither the server nor the transport supplied one.
pub const FALLBACK_MESSAGE: &str = "unknown API error";

/// Field name to list of server-side validation messages.
pub type ServerFieldErrors = BTreeMap<String, Vec<String>>;

/// Errors returned by `ApiClient` and the entity services.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response: connection refused, DNS
    /// failure, timeout.
    #[error("{0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The server answered 2xx but the envelope reports a failure.
    #[error("{message}")]
    Application {
        message: String,
        errors: ServerFieldErrors,
    },

    /// A single-entity envelope carried neither `body` nor `data`.
    #[error("response envelope carried no payload")]
    MissingPayload,

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The owning view was torn down before the response was applied.
    #[error("operation cancelled")]
    Cancelled,
}

impl ApiError {
    /// Human-readable message for display.
    pub fn message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            message
        }
    }

    /// Field errors reported by the server, if any.
    pub fn field_errors(&self) -> Option<&ServerFieldErrors> {
        match self {
            ApiError::Application { errors, .. } if !errors.is_empty() => Some(errors),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_transport_message_falls_back() {
        let err = ApiError::Transport(String::new());
        assert_eq!(err.message(), FALLBACK_MESSAGE);
    }

    #[test]
    fn status_error_displays_message_only() {
        let err = ApiError::Status {
            status: 404,
            message: "Categoria no encontrada".to_string(),
        };
        assert_eq!(err.message(), "Categoria no encontrada");
    }

    #[test]
    fn field_errors_only_for_populated_application_errors() {
        let mut errors = ServerFieldErrors::new();
        errors.insert("precio".to_string(), vec!["must be positive".to_string()]);
        let err = ApiError::Application {
            message: "invalid".to_string(),
            errors,
        };
        assert_eq!(err.field_errors().map(|e| e.len()), Some(1));
        assert!(ApiError::MissingPayload.field_errors().is_none());
    }
}
