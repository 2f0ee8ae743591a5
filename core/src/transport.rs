//! Executes `HttpRequest` values against the network.
//!
//! # Design
//! `Transport` is the only I/O seam. A transport error means no response
//! was received; any response, whatever its status, is returned as data
//! and classified by the client.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};

/// Async executor for plain-data HTTP requests.
pub trait Transport: Send + Sync {
    fn execute<'a>(&'a self, request: HttpRequest) -> BoxFuture<'a, Result<HttpResponse, ApiError>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute<'a>(&'a self, request: HttpRequest) -> BoxFuture<'a, Result<HttpResponse, ApiError>> {
        (**self).execute(request)
    }
}

/// Production transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Fails when the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("gemini-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Setup(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn execute<'a>(&'a self, request: HttpRequest) -> BoxFuture<'a, Result<HttpResponse, ApiError>> {
        Box::pin(async move {
            let mut builder = match request.method {
                HttpMethod::Get => self.client.get(&request.url),
                HttpMethod::Post => self.client.post(&request.url),
            };

            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            builder = builder.timeout(request.timeout);

            builder = match request.body {
                RequestBody::Empty => builder,
                RequestBody::Json(body) => builder
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(body),
                RequestBody::Multipart(form) => {
                    let mut multipart = reqwest::multipart::Form::new();
                    for (name, value) in form.fields {
                        multipart = multipart.text(name, value);
                    }
                    for (name, file) in form.files {
                        let part = reqwest::multipart::Part::bytes(file.bytes)
                            .file_name(file.name)
                            .mime_str(&file.content_type)
                            .map_err(|e| ApiError::Serialization(format!("invalid content type: {e}")))?;
                        multipart = multipart.part(name, part);
                    }
                    builder.multipart(multipart)
                }
            };

            let response = builder.send().await.map_err(map_send_error)?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
                .collect();
            let body = response
                .text()
                .await
                .map_err(|e| ApiError::Connection(format!("failed to read response body: {e}")))?;

            Ok(HttpResponse { status, headers, body })
        })
    }
}

fn map_send_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout(format!("request timeout: {e}"))
    } else {
        ApiError::Connection(e.to_string())
    }
}
