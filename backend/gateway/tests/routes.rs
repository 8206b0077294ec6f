use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use async_trait::async_trait;
use receiptforge_core::{KvStore, ReceiptError, VisionError};
use receiptforge_extractor::providers::mock::MockVisionProvider;
use receiptforge_extractor::{ExtractorConfig, FieldExtractor, RetryPolicy};
use receiptforge_gateway::{build_router, GatewayState};
use receiptforge_store::{InMemoryKvStore, RecordStore};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "receiptforge-test-boundary";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";
const PDF: &[u8] = b"%PDF-1.4\n1 0 obj << >> endobj\n%%EOF";

struct TestApp {
    router: Router,
    kv: Arc<InMemoryKvStore>,
    mock: Arc<MockVisionProvider>,
}

fn app_with(mock: MockVisionProvider, max_upload_bytes: usize) -> TestApp {
    let kv = Arc::new(InMemoryKvStore::new());
    let mock = Arc::new(mock);
    let extractor = FieldExtractor::new(mock.clone()).with_config(ExtractorConfig {
        timeout: Duration::from_millis(500),
        retry: RetryPolicy {
            base_delay_ms: 1,
            ..RetryPolicy::default()
        },
        ..ExtractorConfig::default()
    });
    let state = GatewayState::new(RecordStore::new(kv.clone()), extractor);
    TestApp {
        router: build_router(state, max_upload_bytes),
        kv,
        mock,
    }
}

fn app(mock: MockVisionProvider) -> TestApp {
    app_with(mock, 1024 * 1024)
}

fn structured_reply() -> MockVisionProvider {
    MockVisionProvider::new().with_response(
        r#"Here you go:
```json
{"vendor": "Corner Cafe", "date": "2024-03-09", "amount": 12.5, "currency": "USD", "raw_text": "CORNER CAFE\nLATTE 4.50\nBAGEL 8.00\nTOTAL 12.50"}
```"#,
    )
}

/// One multipart part: (field name, filename, content type, bytes).
type Part<'a> = (&'a str, Option<&'a str>, Option<&'a str>, &'a [u8]);

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content_type, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match filename {
            Some(f) => format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n"),
            None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n"),
        };
        body.extend_from_slice(disposition.as_bytes());
        if let Some(ct) = content_type {
            body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

async fn upload(app: &TestApp, filename: &str, content_type: &str, bytes: &[u8]) -> StatusCode {
    let req = upload_request(&[("receipt", Some(filename), Some(content_type), bytes)]);
    send(app, req).await.0
}

async fn api_listing(app: &TestApp) -> Value {
    let (status, _, body) = send(app, get("/api/receipts")).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

async fn only_receipt(app: &TestApp) -> Value {
    let listing = api_listing(app).await;
    let receipts = listing["receipts"].as_array().unwrap();
    assert_eq!(receipts.len(), 1, "expected exactly one receipt: {listing}");
    receipts[0].clone()
}

#[tokio::test]
async fn test_index_serves_upload_form() {
    let app = app(structured_reply());
    let (status, _, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains(r#"action="/upload""#));
    assert!(html.contains(r#"name="receipt""#));
}

#[tokio::test]
async fn test_upload_redirects_and_lists_record() {
    let app = app(structured_reply());

    let req = upload_request(&[("receipt", Some("cafe.png"), Some("image/png"), PNG)]);
    let (status, headers, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers[header::LOCATION], "/receipts");

    let receipt = only_receipt(&app).await;
    assert_eq!(receipt["filename"], "cafe.png");
    assert_eq!(receipt["mime_type"], "image/png");
    assert_eq!(receipt["fields"]["vendor"], "Corner Cafe");
    assert_eq!(receipt["fields"]["amount"], "12.5");
    assert_eq!(receipt["extraction"]["status"], "structured");

    let (status, _, body) = send(&app, get("/receipts")).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("<td>Corner Cafe</td>"));
    assert!(html.contains(&format!("href=\"/receipt/{}\"", receipt["id"].as_str().unwrap())));

    // The model saw the uploaded bytes with their sniffed type.
    let sent = app.mock.last_request().unwrap();
    assert_eq!(sent.mime_type, "image/png");
    assert_eq!(sent.filename, "cafe.png");
}

#[tokio::test]
async fn test_file_roundtrip_preserves_bytes_and_type() {
    let app = app(structured_reply());
    assert_eq!(upload(&app, "scan.png", "image/png", PNG).await, StatusCode::SEE_OTHER);
    let id = only_receipt(&app).await["id"].as_str().unwrap().to_string();

    let (status, headers, body) = send(&app, get(&format!("/receipt/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, PNG);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(headers[header::CONTENT_LENGTH], PNG.len().to_string().as_str());
    assert_eq!(headers[header::CONTENT_DISPOSITION], "inline; filename=\"scan.png\"");
}

#[tokio::test]
async fn test_pdf_is_served_as_pdf_even_when_declared_otherwise() {
    let app = app(structured_reply());
    assert_eq!(
        upload(&app, "invoice", "application/octet-stream", PDF).await,
        StatusCode::SEE_OTHER
    );
    let id = only_receipt(&app).await["id"].as_str().unwrap().to_string();

    let (status, headers, body) = send(&app, get(&format!("/receipt/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, PDF);
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
}

#[tokio::test]
async fn test_missing_field_is_rejected_without_record() {
    let app = app(structured_reply());
    let req = upload_request(&[("note", None, None, b"hello".as_slice())]);
    let (status, _, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(String::from_utf8(body).unwrap(), "no receipt file provided");
    assert!(app.kv.is_empty());
    assert_eq!(app.mock.calls(), 0);
}

#[tokio::test]
async fn test_empty_file_part_without_name_is_missing() {
    let app = app(structured_reply());
    let req = upload_request(&[("receipt", Some(""), Some("application/octet-stream"), b"".as_slice())]);
    let (status, _, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.kv.is_empty());
}

#[tokio::test]
async fn test_unnamed_file_part_is_stored_and_linked() {
    let app = app(structured_reply());
    let req = upload_request(&[("receipt", None, None, PNG)]);
    let (status, _, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    let receipt = only_receipt(&app).await;
    assert_eq!(receipt["filename"], "");
    let id = receipt["id"].as_str().unwrap().to_string();

    let (status, _, body) = send(&app, get(&format!("/receipt/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, PNG);

    let (_, _, body) = send(&app, get("/receipts")).await;
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains(&format!("<a href=\"/receipt/{id}\">View</a>")));
}

#[tokio::test]
async fn test_zero_byte_file_is_rejected() {
    let app = app(structured_reply());
    assert_eq!(upload(&app, "empty.png", "image/png", b"").await, StatusCode::BAD_REQUEST);
    assert!(app.kv.is_empty());
    assert_eq!(app.mock.calls(), 0);
}

#[tokio::test]
async fn test_text_file_is_unsupported() {
    let app = app(structured_reply());
    assert_eq!(
        upload(&app, "notes.txt", "text/plain", b"lunch 12.50").await,
        StatusCode::UNSUPPORTED_MEDIA_TYPE
    );
    assert!(app.kv.is_empty());
    assert_eq!(app.mock.calls(), 0);
}

#[tokio::test]
async fn test_oversized_body_is_refused() {
    let app = app_with(structured_reply(), 256);
    let big = [PNG, &[0u8; 1024][..]].concat();
    let status = upload(&app, "big.png", "image/png", &big).await;
    assert!(status.is_client_error(), "got {status}");
    assert!(app.kv.is_empty());
}

#[tokio::test]
async fn test_unknown_receipt_is_not_found() {
    let app = app(structured_reply());

    let (status, _, body) = send(&app, get("/receipt/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(String::from_utf8(body).unwrap(), "receipt not found");

    let (status, _, _) = send(&app, get(&format!("/receipt/{}", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&app, get("/api/receipts/not-a-uuid")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_prose_reply_keeps_raw_text_and_truncates_excerpt() {
    let reply = "I could not find structured data, but the receipt reads: MARKET 3 ITEMS TOTAL 7.00";
    let app = app(MockVisionProvider::new().with_response(reply));
    assert_eq!(upload(&app, "market.jpg", "image/jpeg", b"\xFF\xD8\xFF\xE0").await, StatusCode::SEE_OTHER);

    let receipt = only_receipt(&app).await;
    assert_eq!(receipt["extraction"]["status"], "raw_text_only");
    assert_eq!(receipt["fields"]["raw_text"], reply);
    assert!(receipt["fields"]["vendor"].is_null());

    let (_, _, body) = send(&app, get("/receipts")).await;
    let html = String::from_utf8(body).unwrap();
    let excerpt: String = reply.chars().take(50).collect();
    assert!(html.contains(&format!("<td>{excerpt}...</td>")));
    assert!(!html.contains(reply));
}

#[tokio::test]
async fn test_extraction_failure_still_saves_record() {
    let mock = MockVisionProvider::new().with_script(vec![
        Err(VisionError::Status { status: 502, body: "bad gateway".into() }),
        Err(VisionError::Status { status: 502, body: "bad gateway".into() }),
    ]);
    let app = app(mock);
    assert_eq!(upload(&app, "r.png", "image/png", PNG).await, StatusCode::SEE_OTHER);
    assert_eq!(app.mock.calls(), 2);

    let receipt = only_receipt(&app).await;
    assert_eq!(receipt["extraction"]["status"], "failed");
    assert!(receipt["extraction"]["reason"].as_str().unwrap().contains("502"));
    assert!(receipt["fields"]["vendor"].is_null());

    // The file is still retrievable.
    let id = receipt["id"].as_str().unwrap();
    let (status, _, body) = send(&app, get(&format!("/receipt/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, PNG);
}

#[tokio::test]
async fn test_transient_failure_then_success_is_structured() {
    let mock = MockVisionProvider::new().with_script(vec![
        Err(VisionError::Transport("connection reset".into())),
        Ok(r#"{"vendor": "Second Try", "raw_text": "SECOND TRY"}"#.into()),
    ]);
    let app = app(mock);
    assert_eq!(upload(&app, "r.png", "image/png", PNG).await, StatusCode::SEE_OTHER);

    let receipt = only_receipt(&app).await;
    assert_eq!(receipt["extraction"]["status"], "structured");
    assert_eq!(receipt["fields"]["vendor"], "Second Try");
}

#[tokio::test]
async fn test_corrupt_entry_is_skipped_not_fatal() {
    let app = app(structured_reply());
    assert_eq!(upload(&app, "good.png", "image/png", PNG).await, StatusCode::SEE_OTHER);
    app.kv
        .set("receipt:legacy:data", b"{'id': 'legacy', 'data': {}}")
        .await
        .unwrap();

    let (status, _, body) = send(&app, get("/receipts")).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("<td>Corner Cafe</td>"));
    assert!(html.contains("1 stored entry could not be read and was skipped."));

    let listing = api_listing(&app).await;
    assert_eq!(listing["receipts"].as_array().unwrap().len(), 1);
    assert_eq!(listing["skipped"][0]["key"], "receipt:legacy:data");
}

#[tokio::test]
async fn test_listing_escapes_model_output() {
    let app = app(MockVisionProvider::new().with_response(
        r#"{"vendor": "<img src=x onerror=alert(1)>", "raw_text": "a & b"}"#,
    ));
    assert_eq!(upload(&app, "x.png", "image/png", PNG).await, StatusCode::SEE_OTHER);

    let (_, _, body) = send(&app, get("/receipts")).await;
    let html = String::from_utf8(body).unwrap();
    assert!(!html.contains("<img"));
    assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"));
    assert!(html.contains("<td>a &amp; b</td>"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = app(structured_reply());
    let (status, _, body) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);

    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["service"], "receiptforge");
    assert_eq!(health["store"], "memory");
    assert_eq!(health["provider"], "mock");
}

#[tokio::test]
async fn test_api_get_receipt_metadata() {
    let app = app(structured_reply());
    assert_eq!(upload(&app, "cafe.png", "image/png", PNG).await, StatusCode::SEE_OTHER);
    let id = only_receipt(&app).await["id"].as_str().unwrap().to_string();

    let (status, _, body) = send(&app, get(&format!("/api/receipts/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let record: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(record["id"], id.as_str());
    assert_eq!(record["fields"]["currency"], "USD");
}

/// Backend whose writes and enumerations fail, as when the server is down.
struct UnreachableKvStore;

#[async_trait]
impl KvStore for UnreachableKvStore {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, ReceiptError> {
        Err(ReceiptError::StoreUnavailable("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: &[u8]) -> Result<(), ReceiptError> {
        Err(ReceiptError::StoreUnavailable("connection refused".into()))
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>, ReceiptError> {
        Err(ReceiptError::StoreUnavailable("connection refused".into()))
    }
}

fn unreachable_store_router() -> Router {
    let extractor = FieldExtractor::new(Arc::new(structured_reply()));
    let state = GatewayState::new(RecordStore::new(Arc::new(UnreachableKvStore)), extractor);
    build_router(state, 1024 * 1024)
}

async fn send_to(router: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_store_failure_on_upload_is_service_unavailable() {
    let router = unreachable_store_router();
    let req = upload_request(&[("receipt", Some("r.png"), Some("image/png"), PNG)]);
    let (status, headers, body) = send_to(&router, req).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "Service Unavailable");
    assert!(headers.get(header::LOCATION).is_none());
}

#[tokio::test]
async fn test_store_failure_on_listing_is_service_unavailable() {
    let router = unreachable_store_router();

    let (status, _, body) = send_to(&router, get("/receipts")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "Service Unavailable");

    let (status, _, _) = send_to(&router, get("/api/receipts")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _, _) = send_to(&router, get(&format!("/receipt/{}", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
