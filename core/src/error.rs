//! Error types for the analysis service client.
//!
//! # Design
//! Failures are classified once, where the response (or its absence) is
//! observed, into structured kinds. Presentation code formats them; nothing
//! downstream needs to search message text to learn what happened.
//!
//! Remote messages are read from the JSON body fields `message`, `error` or
//! `detail`, in that order, then from a plain-text body. When the body
//! carries none, the message is `None` and the error displays as
//! `Request failed with status code {status}`.

use thiserror::Error;

use crate::http::HttpResponse;

/// Synthesized message when the reachability probe fails.
pub const UNREACHABLE_MESSAGE: &str = "Server not reachable. Please make sure the API server is running.";

/// Errors returned by `TransportClient` operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The pre-flight health check failed; the upload was never sent.
    #[error("{}", UNREACHABLE_MESSAGE)]
    Unreachable,

    /// No response reached the client.
    #[error("Network Error: {0}")]
    Connection(String),

    /// The request exceeded its timeout.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The server returned 404.
    #[error("{}", status_text(&404, .message))]
    NotFound { message: Option<String> },

    /// The server returned a 5xx status.
    #[error("{}", status_text(.status, .message))]
    Server { status: u16, message: Option<String> },

    /// The server rejected the payload (400 or 422).
    #[error("{}", status_text(.status, .message))]
    Validation { status: u16, message: Option<String> },

    /// Any other non-2xx status.
    #[error("{}", status_text(.status, .message))]
    Http { status: u16, message: Option<String> },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// A local file could not be read for upload.
    #[error("could not read file {0}")]
    File(String),

    /// The HTTP client itself could not be constructed.
    #[error("could not build HTTP client: {0}")]
    Setup(String),
}

/// Coarse classification of an `ApiError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unreachable,
    Connection,
    Timeout,
    NotFound,
    Server,
    Validation,
    Http,
    Serialization,
    Deserialization,
    File,
    Setup,
}

impl ApiError {
    /// Classify a non-2xx response.
    pub fn from_response(response: &HttpResponse) -> Self {
        let status = response.status;
        let message = remote_message(&response.body);
        match status {
            404 => ApiError::NotFound { message },
            400 | 422 => ApiError::Validation { status, message },
            500..=599 => ApiError::Server { status, message },
            _ => ApiError::Http { status, message },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unreachable => ErrorKind::Unreachable,
            ApiError::Connection(_) => ErrorKind::Connection,
            ApiError::Timeout(_) => ErrorKind::Timeout,
            ApiError::NotFound { .. } => ErrorKind::NotFound,
            ApiError::Server { .. } => ErrorKind::Server,
            ApiError::Validation { .. } => ErrorKind::Validation,
            ApiError::Http { .. } => ErrorKind::Http,
            ApiError::Serialization(_) => ErrorKind::Serialization,
            ApiError::Deserialization(_) => ErrorKind::Deserialization,
            ApiError::File(_) => ErrorKind::File,
            ApiError::Setup(_) => ErrorKind::Setup,
        }
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound { .. } => Some(404),
            ApiError::Server { status, .. }
            | ApiError::Validation { status, .. }
            | ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The message carried by a received error response. `None` when the
    /// server sent no usable message.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            ApiError::NotFound { message }
            | ApiError::Server { message, .. }
            | ApiError::Validation { message, .. }
            | ApiError::Http { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// True when no response was received at all.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, ApiError::Unreachable | ApiError::Connection(_))
    }
}

fn status_text(status: &u16, message: &Option<String>) -> String {
    match message {
        Some(message) => message.clone(),
        None => format!("Request failed with status code {status}"),
    }
}

/// Extract a human-readable message from an error body.
fn remote_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => ["message", "error", "detail"]
            .iter()
            .find_map(|key| match map.get(*key) {
                Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
                _ => None,
            }),
        Ok(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Ok(_) => None,
        Err(_) => Some(trimmed.to_string()),
    }
}
