use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Uploads above this size are rejected, matching the real service.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CsvRow {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertRow {
    pub data: Value,
    pub table_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UploadedFile {
    pub name: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Analysis {
    pub id: String,
    pub mode: String,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug)]
pub struct Store {
    pub healthy: bool,
    pub database_created: bool,
    pub analyses: Vec<Analysis>,
    pub rows: Vec<CsvRow>,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            healthy: true,
            database_created: false,
            analyses: Vec::new(),
            rows: Vec::new(),
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;

fn error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "message": message.into() })))
}

pub fn app() -> Router {
    app_with_state(Db::default())
}

/// Router over caller-owned state, so tests can inspect or seed it.
pub fn app_with_state(db: Db) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/upload-flash", post(upload_flash))
        .route("/results", get(list_rows))
        .route("/results/{id}", get(get_result))
        .route("/update/{id}", post(update_row))
        .route("/create-database", post(create_database))
        .route("/insert-data", post(insert_data))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_state(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(db)).await
}

async fn health(State(db): State<Db>) -> ApiResult<Value> {
    if db.read().await.healthy {
        Ok(Json(json!({ "status": "ok" })))
    } else {
        Err(error(StatusCode::SERVICE_UNAVAILABLE, "service unavailable"))
    }
}

async fn upload_flash(State(db): State<Db>, mut multipart: Multipart) -> ApiResult<Analysis> {
    let mut mode = String::from("analyze");
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error(StatusCode::BAD_REQUEST, e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" | "files" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| error(StatusCode::BAD_REQUEST, e.body_text()))?;
                files.push(UploadedFile {
                    name: file_name,
                    content_type,
                    size: bytes.len(),
                });
            }
            "mode" => {
                mode = field
                    .text()
                    .await
                    .map_err(|e| error(StatusCode::BAD_REQUEST, e.body_text()))?;
            }
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "No file uploaded"));
    }

    let analysis = Analysis {
        id: Uuid::new_v4().to_string(),
        mode,
        files,
    };
    db.write().await.analyses.push(analysis.clone());
    Ok(Json(analysis))
}

async fn get_result(State(db): State<Db>, Path(id): Path<String>) -> ApiResult<Value> {
    let store = db.read().await;
    if let Some(analysis) = store.analyses.iter().find(|a| a.id == id) {
        return Ok(Json(json!(analysis)));
    }
    store
        .rows
        .iter()
        .find(|r| r.id == id)
        .map(|row| Json(json!(row)))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("Result {id} not found")))
}

async fn list_rows(State(db): State<Db>) -> Json<Vec<CsvRow>> {
    Json(db.read().await.rows.clone())
}

async fn update_row(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<Value>,
) -> ApiResult<CsvRow> {
    let Value::Object(changes) = input else {
        return Err(error(StatusCode::UNPROCESSABLE_ENTITY, "update body must be an object"));
    };
    let mut store = db.write().await;
    let row = store
        .rows
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("Row {id} not found")))?;
    for (key, value) in changes {
        if key != "id" {
            row.fields.insert(key, value);
        }
    }
    Ok(Json(row.clone()))
}

async fn create_database(State(db): State<Db>) -> Json<Value> {
    db.write().await.database_created = true;
    Json(json!({ "message": "Database created" }))
}

async fn insert_data(State(db): State<Db>, Json(input): Json<InsertRow>) -> ApiResult<CsvRow> {
    let Value::Object(mut fields) = input.data else {
        return Err(error(StatusCode::UNPROCESSABLE_ENTITY, "data must be an object"));
    };
    let mut store = db.write().await;
    if !store.database_created {
        return Err(error(StatusCode::BAD_REQUEST, "Database not created"));
    }
    fields.insert("tableName".to_string(), Value::String(input.table_name));
    let row = CsvRow {
        id: (store.rows.len() + 1).to_string(),
        fields,
    };
    store.rows.push(row.clone());
    Ok(Json(row))
}
