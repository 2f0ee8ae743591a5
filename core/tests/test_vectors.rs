//! Verify bindings and error classification against JSON test vectors stored
//! in `test-vectors/`.
//!
//! Each binding vector describes the inputs, the requests the client must
//! send, a simulated response and the expected parsed result. Comparing
//! parsed JSON (not raw strings) avoids false negatives from field-ordering
//! differences.

use std::sync::Mutex;

use futures::future::BoxFuture;
use gemini_client::{
    ApiError, ClientConfig, ErrorKind, FilePayload, HttpMethod, HttpRequest, HttpResponse, NoopObserver,
    RequestBody, Transport, TransportClient,
};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:8000";

/// Answers the health probe with 200 and everything else with `reply`.
struct VectorTransport {
    reply: HttpResponse,
    sent: Mutex<Vec<HttpRequest>>,
}

impl Transport for VectorTransport {
    fn execute<'a>(&'a self, request: HttpRequest) -> BoxFuture<'a, Result<HttpResponse, ApiError>> {
        Box::pin(async move {
            let is_probe = request.url.ends_with("/health");
            self.sent.lock().unwrap().push(request);
            if is_probe {
                Ok(HttpResponse::json(200, r#"{"status":"ok"}"#))
            } else {
                Ok(self.reply.clone())
            }
        })
    }
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        other => panic!("unknown method: {other}"),
    }
}

fn parse_kind(s: &str) -> ErrorKind {
    match s {
        "NotFound" => ErrorKind::NotFound,
        "Validation" => ErrorKind::Validation,
        "Server" => ErrorKind::Server,
        "Http" => ErrorKind::Http,
        other => panic!("unknown kind: {other}"),
    }
}

fn files(case: &Value) -> Vec<FilePayload> {
    case["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|name| FilePayload::new(name.as_str().unwrap(), "image/png", vec![1, 2, 3]))
        .collect()
}

fn pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|pair| {
            let arr = pair.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect()
}

async fn call_binding(client: &TransportClient<VectorTransport>, case: &Value) -> Result<Value, ApiError> {
    let id = case["id"].as_str().unwrap_or_default();
    match case["binding"].as_str().unwrap() {
        "analyze_image" => client.analyze_image(files(case).remove(0)).await,
        "extract_data_from_image" => client.extract_data_from_image(files(case).remove(0)).await,
        "get_analysis_results" => client.get_analysis_results(id).await,
        "process_multiple_files" => client.process_multiple_files(files(case)).await,
        "create_database" => client.create_database().await,
        "insert_row" => {
            client
                .insert_row(case["table_name"].as_str().unwrap(), case["data"].clone())
                .await
        }
        "get_csv_row" => client
            .get_csv_row(id)
            .await
            .map(|row| serde_json::to_value(row).unwrap()),
        "update_csv_row" => client.update_csv_row(id, &case["data"]).await,
        "list_csv_rows" => client
            .list_csv_rows()
            .await
            .map(|rows| serde_json::to_value(rows).unwrap()),
        other => panic!("unknown binding: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Bindings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn binding_test_vectors() {
    let raw = include_str!("../../test-vectors/bindings.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["simulated_response"];
        let transport = VectorTransport {
            reply: HttpResponse::json(sim["status"].as_u64().unwrap() as u16, sim["body"].as_str().unwrap()),
            sent: Mutex::new(Vec::new()),
        };
        let client = TransportClient::with_transport(ClientConfig::new(BASE_URL), transport)
            .with_observer(std::sync::Arc::new(NoopObserver));

        // Verify parse
        let result = call_binding(&client, case).await.unwrap();
        assert_eq!(result, case["expected_result"], "{name}: parsed result");

        // Verify build
        let sent = client_requests(&client);
        let expected = case["expected_requests"].as_array().unwrap();
        assert_eq!(sent.len(), expected.len(), "{name}: request count");

        for (req, exp) in sent.iter().zip(expected) {
            let path = exp["path"].as_str().unwrap();
            assert_eq!(req.method, parse_method(exp["method"].as_str().unwrap()), "{name} {path}: method");
            assert_eq!(req.url, format!("{BASE_URL}{path}"), "{name}: url");
            assert_eq!(
                req.timeout.as_millis() as u64,
                exp["timeout_ms"].as_u64().unwrap(),
                "{name} {path}: timeout"
            );
            assert_eq!(req.header("accept"), Some("application/json"), "{name} {path}: accept");

            match &req.body {
                RequestBody::Empty => {
                    assert!(exp.get("json").is_none() && exp.get("multipart").is_none(), "{name} {path}: body");
                }
                RequestBody::Json(body) => {
                    let body: Value = serde_json::from_str(body).unwrap();
                    assert_eq!(body, exp["json"], "{name} {path}: json body");
                }
                RequestBody::Multipart(form) => {
                    let exp = &exp["multipart"];
                    assert_eq!(form.fields, pairs(&exp["fields"]), "{name} {path}: fields");
                    let files: Vec<_> = form
                        .files
                        .iter()
                        .map(|(field, file)| (field.clone(), file.name.clone()))
                        .collect();
                    assert_eq!(files, pairs(&exp["files"]), "{name} {path}: files");
                }
            }
        }
    }
}

fn client_requests(client: &TransportClient<VectorTransport>) -> Vec<HttpRequest> {
    client.transport().sent.lock().unwrap().clone()
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn error_test_vectors() {
    let raw = include_str!("../../test-vectors/errors.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let client = TransportClient::with_transport(
        ClientConfig::new(BASE_URL),
        VectorTransport {
            reply: HttpResponse::json(200, "{}"),
            sent: Mutex::new(Vec::new()),
        },
    );
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let response = HttpResponse {
            status: case["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: case["body"].as_str().unwrap().to_string(),
        };
        let err = client.parse::<Value>(response).unwrap_err();
        assert_eq!(err.kind(), parse_kind(case["expected_kind"].as_str().unwrap()), "{name}: kind");
        assert_eq!(err.to_string(), case["expected_message"].as_str().unwrap(), "{name}: message");
    }
}
