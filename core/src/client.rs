//! Transport client for the analysis service.
//!
//! # Design
//! Every call is split the same way the data types are: a `build_*` method
//! produces an `HttpRequest`, a `Transport` executes it, and `parse` turns
//! the `HttpResponse` into a typed value or an `ApiError`. The async
//! primitives `fetch`, `submit` and `upload` chain the three steps and
//! report to the injected `RequestObserver`. Each service binding is one of
//! those primitives pointed at a fixed endpoint.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, MultipartForm, RequestBody};
use crate::observer::{notification_message, RequestObserver, TracingObserver};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{AnalysisResult, CsvRow, FilePayload, InsertRow};

/// Endpoint paths exposed by the service.
pub mod endpoints {
    pub const UPLOAD: &str = "/upload-flash";
    pub const RESULTS: &str = "/results";
    pub const UPDATE: &str = "/update";
    pub const CREATE_DATABASE: &str = "/create-database";
    pub const INSERT_DATA: &str = "/insert-data";
    pub const HEALTH: &str = "/health";
}

/// Multipart field carrying a single uploaded file.
pub const FILE_FIELD: &str = "file";
/// Multipart field repeated once per file in a batch upload.
pub const FILES_FIELD: &str = "files";

#[derive(Clone)]
pub struct TransportClient<T = ReqwestTransport> {
    config: ClientConfig,
    transport: T,
    observer: Arc<dyn RequestObserver>,
}

impl<T> std::fmt::Debug for TransportClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TransportClient<ReqwestTransport> {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::with_transport(config, ReqwestTransport::new()?))
    }

    /// Client for the address in `GEMINI_API_URL`, or the public default.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(ClientConfig::from_env())
    }
}

impl<T: Transport> TransportClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        let mut req = HttpRequest::new(method, self.config.url(path), self.config.timeout);
        req.headers.extend(self.config.default_headers.iter().cloned());
        req
    }

    pub fn build_fetch(&self, path: &str, query: &[(&str, &str)]) -> HttpRequest {
        let mut req = self.request(HttpMethod::Get, path);
        req.query = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        req
    }

    pub fn build_submit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self
            .request(HttpMethod::Post, path)
            .with_body(RequestBody::Json(body)))
    }

    pub fn build_probe(&self) -> HttpRequest {
        self.request(HttpMethod::Get, endpoints::HEALTH)
    }

    /// Multipart upload of one file plus extra text fields, on the upload
    /// timeout.
    pub fn build_upload(&self, path: &str, file: FilePayload, extra_fields: &[(&str, &str)]) -> HttpRequest {
        let form = extra_fields
            .iter()
            .fold(MultipartForm::new(), |form, (k, v)| form.text(*k, *v))
            .file(FILE_FIELD, file);
        let mut req = self
            .request(HttpMethod::Post, path)
            .with_body(RequestBody::Multipart(form));
        req.timeout = self.config.upload_timeout;
        req
    }

    /// Batch upload. Uses the default timeout and is sent without a probe.
    pub fn build_process_files(&self, files: Vec<FilePayload>) -> HttpRequest {
        let form = files
            .into_iter()
            .fold(MultipartForm::new(), |form, file| form.file(FILES_FIELD, file));
        self.request(HttpMethod::Post, endpoints::UPLOAD)
            .with_body(RequestBody::Multipart(form))
    }

    /// Decode a 2xx body, or classify the failure. An empty success body
    /// decodes as JSON `null`.
    pub fn parse<R: DeserializeOwned>(&self, response: HttpResponse) -> Result<R, ApiError> {
        if !response.is_success() {
            return Err(ApiError::from_response(&response));
        }
        let body = response.body.trim();
        let body = if body.is_empty() { "null" } else { body };
        serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    // -----------------------------------------------------------------------
    // Primitives
    // -----------------------------------------------------------------------

    fn report(&self, error: ApiError) -> ApiError {
        let notification = notification_message(&error);
        self.observer.on_error(&error, &notification);
        error
    }

    async fn send<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<R, ApiError> {
        self.observer.on_request(&request);
        let response = match self.transport.execute(request).await {
            Ok(response) => response,
            Err(e) => return Err(self.report(e)),
        };
        self.parse(response).map_err(|e| self.report(e))
    }

    /// GET `path` and decode the body.
    pub async fn fetch<R: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<R, ApiError> {
        self.send(self.build_fetch(path, query)).await
    }

    /// POST `body` as JSON to `path` and decode the reply.
    pub async fn submit<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.build_submit(path, body).map_err(|e| self.report(e))?;
        self.send(request).await
    }

    /// Probe the health endpoint. Any failure, whatever its status, is
    /// reported as `ApiError::Unreachable`.
    pub async fn health(&self) -> Result<(), ApiError> {
        let probe = self.build_probe();
        self.observer.on_request(&probe);
        match self.transport.execute(probe).await {
            Ok(response) if response.is_success() => Ok(()),
            Ok(response) => {
                tracing::debug!(status = response.status, "health probe rejected");
                Err(ApiError::Unreachable)
            }
            Err(e) => {
                tracing::debug!(error = %e, "health probe failed");
                Err(ApiError::Unreachable)
            }
        }
    }

    /// Multipart upload guarded by a reachability probe. When the probe
    /// fails the upload is never sent.
    pub async fn upload<R: DeserializeOwned>(
        &self,
        path: &str,
        file: FilePayload,
        extra_fields: &[(&str, &str)],
    ) -> Result<R, ApiError> {
        self.health().await.map_err(|e| self.report(e))?;
        self.send(self.build_upload(path, file, extra_fields)).await
    }

    // -----------------------------------------------------------------------
    // Service bindings
    // -----------------------------------------------------------------------

    pub async fn analyze_image(&self, file: FilePayload) -> Result<AnalysisResult, ApiError> {
        self.upload(endpoints::UPLOAD, file, &[("mode", "analyze")]).await
    }

    pub async fn extract_data_from_image(&self, file: FilePayload) -> Result<AnalysisResult, ApiError> {
        self.upload(endpoints::UPLOAD, file, &[("mode", "extract")]).await
    }

    pub async fn get_analysis_results(&self, id: &str) -> Result<AnalysisResult, ApiError> {
        self.fetch(&format!("{}/{id}", endpoints::RESULTS), &[]).await
    }

    pub async fn process_multiple_files(&self, files: Vec<FilePayload>) -> Result<AnalysisResult, ApiError> {
        self.send(self.build_process_files(files)).await
    }

    pub async fn create_database(&self) -> Result<serde_json::Value, ApiError> {
        self.submit(endpoints::CREATE_DATABASE, &serde_json::json!({}))
            .await
    }

    pub async fn insert_row(&self, table_name: &str, data: serde_json::Value) -> Result<serde_json::Value, ApiError> {
        let body = InsertRow {
            data,
            table_name: table_name.to_string(),
        };
        self.submit(endpoints::INSERT_DATA, &body).await
    }

    pub async fn get_csv_row(&self, id: &str) -> Result<CsvRow, ApiError> {
        self.fetch(&format!("{}/{id}", endpoints::RESULTS), &[]).await
    }

    pub async fn update_csv_row(&self, id: &str, data: &serde_json::Value) -> Result<serde_json::Value, ApiError> {
        self.submit(&format!("{}/{id}", endpoints::UPDATE), data)
            .await
    }

    pub async fn list_csv_rows(&self) -> Result<Vec<CsvRow>, ApiError> {
        self.fetch(endpoints::RESULTS, &[]).await
    }
}
