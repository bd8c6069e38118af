//! Router tests that fail before any query reaches the database.

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        Method, Request, StatusCode,
    },
    Router,
};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use storefront::{build, load, router, AppState, Settings};
use tower::ServiceExt;

fn state(extra: &[(&str, &str)]) -> AppState {
    let settings = Settings::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/storefront_unused".to_string()),
        other => extra.iter().find(|(k, _)| *k == other).map(|(_, v)| v.to_string()),
    })
    .unwrap();
    let pool = PgPoolOptions::new().connect_lazy(&settings.database_url).unwrap();
    AppState {
        pool,
        model: Arc::new(load().unwrap()),
        settings: Arc::new(settings),
    }
}

fn app() -> Router {
    router(state(&[]))
}

async fn send(app: Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(b) = body {
        request = request
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, b.len());
    }
    let request = request
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = send(app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn missing_required_fields_are_reported_per_field() {
    let (status, body) = send(app(), Method::POST, "/api/v1/catalog/color/", Some("{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["details"]["name_uz"], json!(["This field is required."]));
    assert!(body["error"]["details"].get("name_ru").is_none());
}

#[tokio::test]
async fn nested_child_errors_keep_item_positions() {
    let payload = json!({
        "name_uz": "Ko'ylak",
        "description_uz": "Paxta",
        "shape_uz": "Klassik",
        "material_uz": "Paxta",
        "files": [],
        "specs": [
            {"vendor_code": "A-1", "price": "10.00", "color": 1, "size": [], "files": []},
            {"vendor_code": "A-2", "price": "abc", "color": 1, "size": [], "files": []}
        ]
    });
    let (status, body) = send(app(), Method::POST, "/api/v1/catalog/catalog/", Some(&payload.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let specs = &body["error"]["details"]["specs"];
    assert_eq!(specs[0], json!({}));
    assert_eq!(specs[1]["price"], json!(["A valid number is required."]));
}

#[tokio::test]
async fn id_lists_are_required_on_create() {
    let payload = json!({
        "name_uz": "Ko'ylak",
        "description_uz": "Paxta",
        "shape_uz": "Klassik",
        "material_uz": "Paxta",
        "specs": []
    });
    let (status, body) = send(app(), Method::POST, "/api/v1/catalog/catalog/", Some(&payload.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["files"], json!(["This field is required."]));
}

#[tokio::test]
async fn non_object_body_is_rejected() {
    let (status, body) = send(app(), Method::POST, "/api/v1/shopping/apply/", Some("[1, 2]")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["details"]["non_field_errors"],
        json!(["Invalid data. Expected a dictionary, but got list."])
    );
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (status, body) = send(app(), Method::POST, "/api/v1/catalog/size/", Some("{\"name_uz\":")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn non_numeric_ids_are_not_found() {
    let (status, _) = send(app(), Method::GET, "/api/v1/catalog/color/abc/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(app(), Method::DELETE, "/api/v1/content/news/x1/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(app(), Method::POST, "/api/v1/shopping/accept/application/abc/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_filter_value_is_a_validation_error() {
    let (status, body) = send(app(), Method::GET, "/api/v1/catalog/specification/?catalog=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["catalog"], json!(["A valid integer is required."]));
}

#[tokio::test]
async fn page_zero_is_not_found() {
    let (status, _) = send(app(), Method::GET, "/api/v1/content/news/page/?page=0", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn schema_lists_generated_routes() {
    let (status, body) = send(app(), Method::GET, "/api/v1/schema/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/content/news/landing-page/{id}/"]["get"].is_object());
    assert!(body["components"]["schemas"]["GiveApplication"].is_object());
}

#[tokio::test]
async fn oversized_bodies_are_refused() {
    let app = build(state(&[("MAX_BODY_SIZE", "64")])).unwrap();
    let big = json!({"name_uz": "x".repeat(200)}).to_string();
    let (status, _) = send(app, Method::POST, "/api/v1/catalog/color/", Some(&big)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = build(state(&[])).unwrap();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
