//! Request/error hooks injected into the transport client.
//!
//! # Design
//! The client never logs or notifies on its own. It reports each outgoing
//! request and each failure to a `RequestObserver`; the default observer
//! writes them to `tracing`, and presentation code can supply one that
//! raises toasts instead.

use crate::error::ApiError;
use crate::http::HttpRequest;

/// Notification text for failures where no response was received,
/// timeouts included.
pub const CONNECTION_FAILURE_NOTICE: &str =
    "Unable to connect to the server. Please check your network connection.";

/// Notification text when the server gave no usable message.
pub const GENERIC_FAILURE_NOTICE: &str = "An unexpected error occurred. Please try again.";

/// Capability interface for request side effects.
pub trait RequestObserver: Send + Sync {
    fn on_request(&self, request: &HttpRequest);

    /// Called once per failed request with the text meant for the user.
    fn on_error(&self, error: &ApiError, notification: &str);
}

/// User-facing notification for a failed request.
pub fn notification_message(error: &ApiError) -> String {
    if error.is_connection_failure() || matches!(error, ApiError::Timeout(_)) {
        return CONNECTION_FAILURE_NOTICE.to_string();
    }
    match error.status() {
        Some(_) => error
            .remote_message()
            .filter(|m| !m.is_empty())
            .unwrap_or(GENERIC_FAILURE_NOTICE)
            .to_string(),
        None => GENERIC_FAILURE_NOTICE.to_string(),
    }
}

/// Writes requests and failures to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RequestObserver for TracingObserver {
    fn on_request(&self, request: &HttpRequest) {
        tracing::debug!(method = request.method.as_str(), url = %request.url, "sending request");
    }

    fn on_error(&self, error: &ApiError, notification: &str) {
        tracing::warn!(kind = ?error.kind(), status = ?error.status(), %error, notification, "request failed");
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RequestObserver for NoopObserver {
    fn on_request(&self, _request: &HttpRequest) {}

    fn on_error(&self, _error: &ApiError, _notification: &str) {}
}
