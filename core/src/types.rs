//! Domain DTOs for the analysis service.
//!
//! # Design
//! Identifiers (analysis ids, row ids, table names) are opaque strings and
//! pass through unchanged. Analysis replies and CSV rows are left as
//! `serde_json::Value` because the service does not promise a schema for
//! them: a row's `id` may be a string, a number, or missing altogether.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Reply of the analysis endpoints. No structure is imposed.
pub type AnalysisResult = serde_json::Value;

/// A file to upload: raw bytes plus name and MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FilePayload {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::File(format!("{}: {e}", path.display())))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            name,
            content_type,
            bytes,
        })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// One row of the tabular store, exactly as the backend returned it.
pub type CsvRow = serde_json::Value;

/// Request payload for `/insert-data`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsertRow {
    pub data: serde_json::Value,
    pub table_name: String,
}
