//! Scripted transport and recording observer shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::sync::Notify;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::observer::RequestObserver;
use crate::transport::Transport;
use crate::types::FilePayload;

pub(crate) fn png(name: &str) -> FilePayload {
    FilePayload::new(name, "image/png", vec![0x89, b'P', b'N', b'G'])
}

/// Replays canned replies in order and records every request it receives.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, ApiError>>>,
    sent: Mutex<Vec<HttpRequest>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Hold every reply until `gate` is notified.
    pub(crate) fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub(crate) fn reply_json(self, status: u16, body: &serde_json::Value) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::json(status, body.to_string())));
        self
    }

    pub(crate) fn fail(self, error: ApiError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn execute<'a>(&'a self, request: HttpRequest) -> BoxFuture<'a, Result<HttpResponse, ApiError>> {
        Box::pin(async move {
            self.sent.lock().unwrap().push(request);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Connection("no scripted reply".to_string())))
        })
    }
}

#[derive(Default)]
pub(crate) struct RecordingObserver {
    requests: Mutex<Vec<String>>,
    errors: Mutex<Vec<(ApiError, String)>>,
}

impl RecordingObserver {
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn errors(&self) -> Vec<(ApiError, String)> {
        self.errors.lock().unwrap().clone()
    }
}

impl RequestObserver for RecordingObserver {
    fn on_request(&self, request: &HttpRequest) {
        self.requests
            .lock()
            .unwrap()
            .push(format!("{} {}", request.method.as_str(), request.url));
    }

    fn on_error(&self, error: &ApiError, notification: &str) {
        self.errors
            .lock()
            .unwrap()
            .push((error.clone(), notification.to_string()));
    }
}
