//! The response envelope shared by every endpoint of the remote API.
//!
//! # Design
//! The server wraps payloads as `{ success, data?, body?, msg?, errors? }`
//! and is inconsistent about which of `data` and `body` carries a created or
//! updated entity. The precedence rule lives here, once: `payload` tags the
//! populated field with `body` winning, and `into_entity` / `into_list` are
//! the only unwrapping entry points the services use.

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ServerFieldErrors, FALLBACK_MESSAGE};

fn default_success() -> bool {
    true
}

/// Uniform response wrapper.
///
/// A missing `success` flag is read as `true`: older endpoints omit it on
/// plain listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    // Absent reads as `None`; `default` would add a `T: Default` bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ServerFieldErrors>,
}

/// Which envelope field carried the payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    Body(T),
    Data(T),
    Empty,
}

impl<T> Payload<T> {
    pub fn into_inner(self) -> Option<T> {
        match self {
            Payload::Body(value) | Payload::Data(value) => Some(value),
            Payload::Empty => None,
        }
    }
}

impl<T> Envelope<T> {
    /// An envelope with no payload, used for empty 2xx bodies.
    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            body: None,
            msg: None,
            errors: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        !self.success || self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// Server message, or the generic fallback.
    pub fn message(&self) -> String {
        self.msg
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(FALLBACK_MESSAGE)
            .to_string()
    }

    /// Turn a failure envelope into `ApiError::Application`.
    pub fn check(self) -> Result<Self, ApiError> {
        if self.is_failure() {
            return Err(ApiError::Application {
                message: self.message(),
                errors: self.errors.unwrap_or_default(),
            });
        }
        Ok(self)
    }

    /// Tag the payload; `body` takes precedence over `data`.
    pub fn payload(self) -> Payload<T> {
        match (self.body, self.data) {
            (Some(body), _) => Payload::Body(body),
            (None, Some(data)) => Payload::Data(data),
            (None, None) => Payload::Empty,
        }
    }

    /// Unwrap a single created or updated entity.
    pub fn into_entity(self) -> Result<T, ApiError> {
        self.payload().into_inner().ok_or(ApiError::MissingPayload)
    }
}

impl<E> Envelope<Vec<E>> {
    /// Unwrap a collection listing. Only `data` is read; absent means empty.
    pub fn into_list(self) -> Vec<E> {
        self.data.unwrap_or_default()
    }
}
