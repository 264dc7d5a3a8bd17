use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

use wishcraft_api::sqlite_store::SqliteStore;
use wishcraft_api::{build_app, db, AppState};

// -- Helpers ------------------------------------------------------------------

static DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Fresh app over an isolated in-memory database. Named shared-cache URIs so
/// every pooled connection sees the same schema. The store is returned too
/// so tests can break the schema underneath the app.
async fn setup_app_with_store() -> (axum::Router, Arc<SqliteStore>) {
    let n = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let url = format!("sqlite:file:wishcraft_test_{n}?mode=memory&cache=shared");
    let pool = db::init_pool(&url).await.unwrap();
    let store = Arc::new(SqliteStore::new(pool));
    let state = AppState {
        store: store.clone(),
        public_base_url: "http://localhost:8787".to_string(),
        http: reqwest::Client::new(),
    };
    (build_app(state), store)
}

async fn setup_app() -> axum::Router {
    setup_app_with_store().await.0
}

async fn json_request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    password_header: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let has_body = body.is_some();
    let body_str = body.map(|b| b.to_string()).unwrap_or_default();
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(password) = password_header {
        builder = builder.header("x-portal-password", password);
    }
    if has_body {
        builder = builder.header("content-type", "application/json");
    }

    let req = builder.body(Body::from(body_str)).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn raw_get(app: &axum::Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, content_type, bytes)
}

async fn save_portal(app: &axum::Router, id: Option<&str>, data: Value) -> String {
    let mut body = json!({ "data": data });
    if let Some(id) = id {
        body["id"] = json!(id);
    }
    let (status, resp) = json_request(app, "POST", "/api/portal", None, Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    resp["id"].as_str().unwrap().to_string()
}

// -- Save / load --------------------------------------------------------------

#[tokio::test]
async fn test_roundtrip_without_password() {
    let app = setup_app().await;
    let id = save_portal(&app, None, json!({ "recipientName": "A" })).await;

    let (status, body) = json_request(&app, "GET", &format!("/api/portal?id={id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["recipientName"], "A");
    assert_eq!(body["data"]["stats"]["views"], 1);
    assert_eq!(body["data"]["passcodeHash"], Value::Null);

    let (status, body) = json_request(&app, "GET", &format!("/api/portal?id={id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stats"]["views"], 2);
}

#[tokio::test]
async fn test_generated_id_shape() {
    let app = setup_app().await;
    let id = save_portal(&app, None, json!({ "x": 1 })).await;

    assert_eq!(id.len(), 7);
    assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));

    let (status, body) = json_request(&app, "GET", &format!("/api/portal?id={id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["x"], 1);
}

#[tokio::test]
async fn test_load_requires_id() {
    let app = setup_app().await;
    let (status, body) = json_request(&app, "GET", "/api/portal", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_id");
}

#[tokio::test]
async fn test_load_unknown_id() {
    let app = setup_app().await;
    let (status, body) = json_request(&app, "GET", "/api/portal?id=zzzzzzz", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_save_overwrites_completely() {
    let app = setup_app().await;
    save_portal(&app, Some("abc1234"), json!({ "old": 1, "keep": "no" })).await;
    save_portal(&app, Some("abc1234"), json!({ "new": 2 })).await;

    let (status, body) =
        json_request(&app, "GET", "/api/portal?id=abc1234", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["new"], 2);
    assert!(body["data"].get("old").is_none());
    assert!(body["data"].get("keep").is_none());
}

#[tokio::test]
async fn test_views_increase_sequentially() {
    let app = setup_app().await;
    let id = save_portal(&app, None, json!({ "n": 1 })).await;

    for expected in 1..=4 {
        let (status, body) =
            json_request(&app, "GET", &format!("/api/portal?id={id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["stats"]["views"], expected);
    }
}

// -- Password gating ----------------------------------------------------------

#[tokio::test]
async fn test_password_gating_full_flow() {
    let app = setup_app().await;
    let id = save_portal(&app, None, json!({ "passcode": "hunter2xyz", "x": 1 })).await;

    // No password: protected marker, no content, no view counted.
    let (status, body) = json_request(&app, "GET", &format!("/api/portal?id={id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["protected"], true);
    assert_eq!(body["id"], id.as_str());
    assert!(body.get("data").is_none());

    // Wrong password: 401, still no view counted.
    let (status, body) = json_request(
        &app,
        "GET",
        &format!("/api/portal?id={id}"),
        Some("wrong"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_password");

    // Correct password via header: content comes back, views start at 1
    // because the gated attempts above never incremented.
    let (status, body) = json_request(
        &app,
        "GET",
        &format!("/api/portal?id={id}"),
        Some("hunter2xyz"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["x"], 1);
    assert_eq!(body["data"]["stats"]["views"], 1);

    // The raw passcode never appears in a response, and the stored payload
    // no longer carries the passcode field.
    assert!(!body.to_string().contains("hunter2xyz"));
    assert!(body["data"].get("passcode").is_none());
    assert!(body["data"]["passcodeHash"].is_string());

    // The salt and KDF parameters are withheld from responses.
    assert!(body["data"].get("passSalt").is_none());
    assert!(body["data"].get("passIterations").is_none());
}

#[tokio::test]
async fn test_non_string_passcode_rejects_save() {
    let app = setup_app().await;

    // A numeric passcode must not produce an unprotected portal.
    let (status, body) = json_request(
        &app,
        "POST",
        "/api/portal",
        None,
        Some(json!({ "id": "num0001", "data": { "passcode": 1234, "x": 1 } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_data");

    // The rejected save stored nothing.
    let (status, _) = json_request(&app, "GET", "/api/portal?id=num0001", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_null_passcode_means_unprotected() {
    let app = setup_app().await;
    let id = save_portal(&app, None, json!({ "passcode": null, "x": 1 })).await;

    let (status, body) = json_request(&app, "GET", &format!("/api/portal?id={id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["x"], 1);
    assert_eq!(body["data"]["passcodeHash"], Value::Null);
}

#[tokio::test]
async fn test_password_via_query_param() {
    let app = setup_app().await;
    let id = save_portal(&app, None, json!({ "passcode": "qp-secret", "y": 2 })).await;

    let (status, body) = json_request(
        &app,
        "GET",
        &format!("/api/portal?id={id}&password=qp-secret"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["y"], 2);
}

#[tokio::test]
async fn test_saving_without_passcode_clears_protection() {
    let app = setup_app().await;
    save_portal(&app, Some("clr0001"), json!({ "passcode": "gone", "a": 1 })).await;
    save_portal(&app, Some("clr0001"), json!({ "a": 2 })).await;

    // Overwrite without a passcode nulled the password columns.
    let (status, body) = json_request(&app, "GET", "/api/portal?id=clr0001", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["a"], 2);
    assert_eq!(body["data"]["passcodeHash"], Value::Null);
}

// -- Upload / files -----------------------------------------------------------

#[tokio::test]
async fn test_upload_and_fetch() {
    let app = setup_app().await;

    // "hello" in base64
    let (status, body) = json_request(
        &app,
        "POST",
        "/api/upload",
        None,
        Some(json!({ "filename": "hello.txt", "data": "aGVsbG8=" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let url = body["url"].as_str().unwrap();
    let path = url.strip_prefix("http://localhost:8787").unwrap();
    assert!(path.starts_with("/files/"));
    assert!(path.ends_with("hello.txt"));

    let (status, content_type, bytes) = raw_get(&app, path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/octet-stream"));
    assert_eq!(bytes, b"hello");
}

#[tokio::test]
async fn test_upload_data_url_content_type() {
    let app = setup_app().await;

    let (status, body) = json_request(
        &app,
        "POST",
        "/api/upload",
        None,
        Some(json!({ "filename": "note.txt", "data": "data:text/plain;base64,aGVsbG8=" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let url = body["url"].as_str().unwrap();
    let path = url.strip_prefix("http://localhost:8787").unwrap();

    let (status, content_type, bytes) = raw_get(&app, path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/plain"));
    assert_eq!(bytes, b"hello");
}

#[tokio::test]
async fn test_upload_same_name_twice_distinct_urls() {
    let app = setup_app().await;
    let payload = json!({ "filename": "same.bin", "data": "aGVsbG8=" });

    let (status, first) = json_request(&app, "POST", "/api/upload", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = json_request(&app, "POST", "/api/upload", None, Some(payload)).await;
    assert_eq!(status, StatusCode::OK);

    let first_url = first["url"].as_str().unwrap();
    let second_url = second["url"].as_str().unwrap();
    assert_ne!(first_url, second_url);

    // Both remain independently fetchable.
    for url in [first_url, second_url] {
        let path = url.strip_prefix("http://localhost:8787").unwrap();
        let (status, _, bytes) = raw_get(&app, path).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, b"hello");
    }
}

#[tokio::test]
async fn test_upload_requires_data() {
    let app = setup_app().await;
    let (status, body) = json_request(
        &app,
        "POST",
        "/api/upload",
        None,
        Some(json!({ "filename": "x.bin" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_data");
}

#[tokio::test]
async fn test_upload_rejects_bad_base64() {
    let app = setup_app().await;
    let (status, body) = json_request(
        &app,
        "POST",
        "/api/upload",
        None,
        Some(json!({ "data": "not base64!!" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_data");
}

#[tokio::test]
async fn test_unknown_file_404() {
    let app = setup_app().await;
    let (status, _, _) = raw_get(&app, "/files/does-not-exist.bin").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Deployment signals -------------------------------------------------------

#[tokio::test]
async fn test_save_reports_missing_portals_table() {
    let (app, store) = setup_app_with_store().await;

    sqlx::query("DROP TABLE portals")
        .execute(store.pool())
        .await
        .unwrap();

    let (status, body) = json_request(
        &app,
        "POST",
        "/api/portal",
        None,
        Some(json!({ "data": { "x": 1 } })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "table_missing");
    assert!(body["message"].as_str().unwrap().contains("portals"));
}

#[tokio::test]
async fn test_load_reports_missing_portals_table() {
    let (app, store) = setup_app_with_store().await;

    sqlx::query("DROP TABLE portals")
        .execute(store.pool())
        .await
        .unwrap();

    let (status, body) = json_request(&app, "GET", "/api/portal?id=abc1234", None, None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "table_missing");
}

#[tokio::test]
async fn test_upload_reports_missing_objects_table() {
    let (app, store) = setup_app_with_store().await;

    sqlx::query("DROP TABLE objects")
        .execute(store.pool())
        .await
        .unwrap();

    let (status, body) = json_request(
        &app,
        "POST",
        "/api/upload",
        None,
        Some(json!({ "filename": "x.bin", "data": "aGVsbG8=" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "bucket_missing");
    assert!(body["message"].as_str().unwrap().contains("objects"));
}

// -- Ancillary routes ---------------------------------------------------------

#[tokio::test]
async fn test_health() {
    let app = setup_app().await;
    let (status, body) = json_request(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_music_search_requires_query() {
    let app = setup_app().await;
    let (status, body) = json_request(&app, "GET", "/api/music_search", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_query");
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = setup_app().await;
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/api/portal")
        .header("origin", "https://example.com")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type,x-portal-password")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn test_admin_stats_with_token() {
    std::env::set_var("ADMIN_TOKEN", "stats-test-token");

    let app = setup_app().await;
    save_portal(&app, None, json!({ "celebrationType": "birthday" })).await;
    save_portal(&app, None, json!({ "celebrationType": "birthday" })).await;
    save_portal(&app, None, json!({ "noType": true })).await;

    // Wrong bearer token is rejected.
    let req = Request::builder()
        .method("GET")
        .uri("/admin/stats")
        .header("authorization", "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Correct token gets the aggregates.
    let req = Request::builder()
        .method("GET")
        .uri("/admin/stats")
        .header("authorization", "Bearer stats-test-token")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["totalPortals"], 3);
    assert_eq!(body["totalViews"], 0);
    assert_eq!(body["byType"]["birthday"], 2);
    assert_eq!(body["byType"]["general"], 1);
}
