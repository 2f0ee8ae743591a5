//! Presentation-facing wrapper that tracks loading and error state per call.
//!
//! # Design
//! Each operation returns a `TrackedCall`. Its state lives in a `watch`
//! channel owned by that call alone: it starts as `Pending`, and awaiting the
//! call drives the request and publishes `Success` or `Failure`. Concurrent
//! calls never overwrite one another's state.
//!
//! Failures are turned into an `OperationError` whose `message` is what the
//! user should see. Only image analysis gets the friendly rewrites; every
//! other operation surfaces the error's own message.

use std::future::{Future, IntoFuture};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::watch;

use crate::client::TransportClient;
use crate::error::{ApiError, ErrorKind};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{AnalysisResult, CsvRow, FilePayload};

pub const ANALYSIS_TIMEOUT_MESSAGE: &str =
    "The analysis took too long. Please try again with a smaller image.";
pub const ANALYSIS_NOT_FOUND_MESSAGE: &str =
    "The analysis endpoint was not found. Please check the server configuration.";
pub const ANALYSIS_SERVER_ERROR_MESSAGE: &str =
    "The server encountered an error while analyzing the image. Please try again later.";

/// Operations exposed to presentation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    AnalyzeImage,
    ExtractData,
    GetResults,
    ProcessFiles,
    CreateDatabase,
    InsertData,
    GetCsvRow,
    UpdateCsvRow,
    ListCsvRows,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::AnalyzeImage => "analyze_image",
            Operation::ExtractData => "extract_data",
            Operation::GetResults => "get_results",
            Operation::ProcessFiles => "process_files",
            Operation::CreateDatabase => "create_database",
            Operation::InsertData => "insert_data",
            Operation::GetCsvRow => "get_csv_row",
            Operation::UpdateCsvRow => "update_csv_row",
            Operation::ListCsvRows => "list_csv_rows",
        }
    }
}

/// A failed operation, with the text to show the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct OperationError {
    pub operation: Operation,
    pub message: String,
    #[source]
    pub source: ApiError,
}

impl OperationError {
    pub fn new(operation: Operation, source: ApiError, base_url: &str) -> Self {
        Self {
            operation,
            message: user_message(operation, &source, base_url),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// State of one tracked call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallState<T> {
    Pending,
    Success(T),
    Failure(OperationError),
}

impl<T> CallState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, CallState::Pending)
    }

    pub fn error(&self) -> Option<&OperationError> {
        match self {
            CallState::Failure(e) => Some(e),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            CallState::Success(v) => Some(v),
            _ => None,
        }
    }
}

/// Message shown to the user for a failed operation.
///
/// Image analysis applies, in order: timeout, network failure (naming
/// `base_url`), not found (404), server error (500). Each rule matches on the
/// structured error or on the message text. Anything else, other 5xx
/// statuses included, keeps its own message.
pub fn user_message(operation: Operation, error: &ApiError, base_url: &str) -> String {
    let message = error.to_string();
    if operation != Operation::AnalyzeImage {
        return message;
    }
    let kind = error.kind();
    if kind == ErrorKind::Timeout || message.contains("timeout") {
        ANALYSIS_TIMEOUT_MESSAGE.to_string()
    } else if kind == ErrorKind::Connection || message.contains("Network") {
        format!("Cannot connect to the analysis server at {base_url}. Please make sure it is running.")
    } else if kind == ErrorKind::NotFound || message.contains("404") {
        ANALYSIS_NOT_FOUND_MESSAGE.to_string()
    } else if error.status() == Some(500) || message.contains("500") {
        ANALYSIS_SERVER_ERROR_MESSAGE.to_string()
    } else {
        message
    }
}

/// One in-flight operation. Call `subscribe` before awaiting to observe it.
///
/// The request only runs while the call is awaited. Dropping it unawaited
/// publishes nothing further: receivers keep reading `Pending`, and
/// `changed()` returns an error once the call is gone.
#[must_use = "a tracked call does nothing until awaited"]
pub struct TrackedCall<'a, V> {
    operation: Operation,
    base_url: &'a str,
    state: watch::Sender<CallState<V>>,
    call: BoxFuture<'a, Result<V, ApiError>>,
}

impl<'a, V> TrackedCall<'a, V> {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Receiver for this call's state. It starts at `Pending` and moves to
    /// `Success` or `Failure` exactly once, when the awaited call settles.
    /// If the call is dropped without being awaited it stays `Pending`.
    pub fn subscribe(&self) -> watch::Receiver<CallState<V>> {
        self.state.subscribe()
    }
}

impl<'a, V> IntoFuture for TrackedCall<'a, V>
where
    V: Clone + Send + Sync + 'a,
{
    type Output = Result<V, OperationError>;
    type IntoFuture = BoxFuture<'a, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let operation = self.operation;
            match self.call.await {
                Ok(value) => {
                    tracing::debug!(operation = operation.as_str(), "operation succeeded");
                    self.state.send_replace(CallState::Success(value.clone()));
                    Ok(value)
                }
                Err(source) => {
                    let error = OperationError::new(operation, source, self.base_url);
                    tracing::warn!(
                        operation = operation.as_str(),
                        kind = ?error.kind(),
                        message = %error.message,
                        "operation failed"
                    );
                    self.state.send_replace(CallState::Failure(error.clone()));
                    Err(error)
                }
            }
        })
    }
}

#[derive(Debug, Clone)]
pub struct RequestOrchestrator<T = ReqwestTransport> {
    client: TransportClient<T>,
}

impl<T: Transport> RequestOrchestrator<T> {
    pub fn new(client: TransportClient<T>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &TransportClient<T> {
        &self.client
    }

    fn track<'a, V, F>(&'a self, operation: Operation, call: F) -> TrackedCall<'a, V>
    where
        F: Future<Output = Result<V, ApiError>> + Send + 'a,
    {
        let (state, _) = watch::channel(CallState::Pending);
        TrackedCall {
            operation,
            base_url: self.client.base_url(),
            state,
            call: Box::pin(call),
        }
    }

    pub fn analyze_image(&self, file: FilePayload) -> TrackedCall<'_, AnalysisResult> {
        self.track(Operation::AnalyzeImage, self.client.analyze_image(file))
    }

    pub fn extract_data(&self, file: FilePayload) -> TrackedCall<'_, AnalysisResult> {
        self.track(Operation::ExtractData, self.client.extract_data_from_image(file))
    }

    pub fn get_results<'a>(&'a self, id: &'a str) -> TrackedCall<'a, AnalysisResult> {
        self.track(Operation::GetResults, self.client.get_analysis_results(id))
    }

    pub fn process_files(&self, files: Vec<FilePayload>) -> TrackedCall<'_, AnalysisResult> {
        self.track(Operation::ProcessFiles, self.client.process_multiple_files(files))
    }

    pub fn create_database(&self) -> TrackedCall<'_, serde_json::Value> {
        self.track(Operation::CreateDatabase, self.client.create_database())
    }

    pub fn insert_data<'a>(
        &'a self,
        table_name: &'a str,
        data: serde_json::Value,
    ) -> TrackedCall<'a, serde_json::Value> {
        self.track(Operation::InsertData, self.client.insert_row(table_name, data))
    }

    pub fn get_csv_row<'a>(&'a self, id: &'a str) -> TrackedCall<'a, CsvRow> {
        self.track(Operation::GetCsvRow, self.client.get_csv_row(id))
    }

    pub fn update_csv_row<'a>(
        &'a self,
        id: &'a str,
        data: &'a serde_json::Value,
    ) -> TrackedCall<'a, serde_json::Value> {
        self.track(Operation::UpdateCsvRow, self.client.update_csv_row(id, data))
    }

    pub fn list_csv_rows(&self) -> TrackedCall<'_, Vec<CsvRow>> {
        self.track(Operation::ListCsvRows, self.client.list_csv_rows())
    }
}
