//! HTTP API integration tests
//!
//! Exercises the axum router directly with `tower::ServiceExt::oneshot`,
//! no listening socket involved.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;
use zoomon_ingest::config::ServiceConfig;
use zoomon_ingest::{build_router, AppState};

const ISOLATES_XLSX: &[u8] = include_bytes!("fixtures/isolates.xlsx");

async fn test_app(report_dir: &TempDir) -> axum::Router {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    zoomon_ingest::db::schema::initialize_schema(&pool)
        .await
        .expect("Schema initialization failed");

    let mut config = ServiceConfig::default();
    config.report_dir = report_dir.path().to_path_buf();
    build_router(AppState::new(pool, config))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body is not JSON")
}

#[tokio::test]
async fn test_health_endpoint() {
    let report_dir = TempDir::new().unwrap();
    let app = test_app(&report_dir).await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "zoomon-ingest");
}

#[tokio::test]
async fn test_import_isolates_returns_report() {
    let report_dir = TempDir::new().unwrap();
    let app = test_app(&report_dir).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/import/isolates")
                .body(Body::from(ISOLATES_XLSX))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["TotalRecords"], 3);
    assert_eq!(json["SuccessfullySaved"], 3);
    assert_eq!(json["Failures"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_import_rejects_unparseable_body() {
    let report_dir = TempDir::new().unwrap();
    let app = test_app(&report_dir).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/import/isolates")
                .body(Body::from("definitely not a spreadsheet"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "IMPORT_ERROR");
}

#[tokio::test]
async fn test_import_rejects_empty_body() {
    let report_dir = TempDir::new().unwrap();
    let app = test_app(&report_dir).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/import/isolates")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "IMPORT_ERROR");
}

#[tokio::test]
async fn test_import_rejects_unknown_kind() {
    let report_dir = TempDir::new().unwrap();
    let app = test_app(&report_dir).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/import/unknown")
                .body(Body::from(ISOLATES_XLSX))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}
