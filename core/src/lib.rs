//! Async client for the Gemini image-analysis service.
//!
//! # Overview
//! `TransportClient` builds `HttpRequest` values, hands them to a
//! `Transport` for execution, and parses the `HttpResponse` it gets back.
//! `RequestOrchestrator` wraps each service call for presentation code,
//! tracking loading and error state per call and producing user-facing
//! error messages.
//!
//! # Design
//! - Requests and responses are plain data; the `Transport` trait is the
//!   only I/O seam, so bindings can be tested against scripted replies.
//! - Logging and notifications go through an injected `RequestObserver`.
//! - Failures are classified into `ApiError` kinds where they are observed.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod observer;
pub mod orchestrator;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::TransportClient;
pub use config::ClientConfig;
pub use error::{ApiError, ErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse, MultipartForm, RequestBody};
pub use observer::{notification_message, NoopObserver, RequestObserver, TracingObserver};
pub use orchestrator::{CallState, Operation, OperationError, RequestOrchestrator, TrackedCall};
pub use transport::{ReqwestTransport, Transport};
pub use types::{AnalysisResult, CsvRow, FilePayload, InsertRow};
