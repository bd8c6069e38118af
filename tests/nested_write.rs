//! End-to-end writes against PostgreSQL. Set `TEST_DATABASE_URL` to run them.

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{ACCEPT_LANGUAGE, CONTENT_TYPE},
        Method, Request, StatusCode,
    },
    Router,
};
use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use storefront::{apply_migrations, load, router, AppState, Settings};
use tokio::sync::Mutex;
use tower::ServiceExt;

static MIGRATED: Mutex<bool> = Mutex::const_new(false);

async fn setup() -> Option<(Router, PgPool)> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return None;
    };
    let settings = Settings::from_lookup(|key| (key == "DATABASE_URL").then(|| url.clone())).unwrap();
    let pool = PgPoolOptions::new().max_connections(4).connect(&url).await.unwrap();
    let model = load().unwrap();
    {
        let mut migrated = MIGRATED.lock().await;
        if !*migrated {
            apply_migrations(&pool, &model).await.unwrap();
            *migrated = true;
        }
    }
    let state = AppState {
        pool: pool.clone(),
        model: Arc::new(model),
        settings: Arc::new(settings),
    };
    Some((router(state), pool))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    call_in(app, method, uri, body, None).await
}

async fn call_in(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    lang: Option<&str>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(lang) = lang {
        request = request.header(ACCEPT_LANGUAGE, lang);
    }
    let body = match body {
        Some(b) => {
            request = request.header(CONTENT_TYPE, "application/json");
            Body::from(b.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn create(app: &Router, uri: &str, body: Value) -> i64 {
    let (status, created) = call(app, Method::POST, uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    created["data"]["id"].as_i64().unwrap()
}

async fn spec_count(pool: &PgPool, catalog: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM specifications WHERE catalog_id = $1")
        .bind(catalog)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn catalog_body(name: &str, specs: Value) -> Value {
    json!({
        "name_uz": name,
        "description_uz": "Paxta matosidan",
        "shape_uz": "Klassik",
        "material_uz": "Paxta",
        "files": [],
        "specs": specs,
    })
}

fn spec(vendor_code: &str, price: &str, color: i64) -> Value {
    json!({"vendor_code": vendor_code, "price": price, "color": color, "size": [], "files": []})
}

fn token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[tokio::test]
async fn put_replaces_every_specification() {
    let Some((app, pool)) = setup().await else { return };
    let red = create(&app, "/api/v1/catalog/color/", json!({"name_uz": "Qizil"})).await;
    let size = create(&app, "/api/v1/catalog/size/", json!({"name_uz": "M", "size_type": "clothes"})).await;

    let catalog = create(
        &app,
        "/api/v1/catalog/catalog/",
        catalog_body(
            "Ko'ylak",
            json!([
                {"vendor_code": "A-1", "price": "100.00", "color": red, "size": [size, size], "files": []},
                spec("A-2", "120.50", red),
            ]),
        ),
    )
    .await;
    assert_eq!(spec_count(&pool, catalog).await, 2);

    let uri = format!("/api/v1/catalog/catalog/{}/", catalog);
    let (status, updated) = call(
        &app,
        Method::PUT,
        &uri,
        Some(catalog_body("Ko'ylak", json!([spec("B-1", "90", red)]))),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(spec_count(&pool, catalog).await, 1);

    let (status, fetched) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let specs = fetched["data"]["specs"].as_array().unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0]["vendor_code"], "B-1");
    assert_eq!(specs[0]["price"], "90.00");
}

#[tokio::test]
async fn patch_without_specs_clears_them() {
    let Some((app, pool)) = setup().await else { return };
    let red = create(&app, "/api/v1/catalog/color/", json!({"name_uz": "Qizil"})).await;
    let catalog = create(
        &app,
        "/api/v1/catalog/catalog/",
        catalog_body("Shim", json!([spec("S-1", "50", red)])),
    )
    .await;

    let uri = format!("/api/v1/catalog/catalog/{}/", catalog);
    let (status, patched) = call(&app, Method::PATCH, &uri, Some(json!({"name_ru": "Брюки"}))).await;
    assert_eq!(status, StatusCode::OK, "{}", patched);
    assert_eq!(patched["data"]["name_ru"], "Брюки");
    assert_eq!(patched["data"]["name_uz"], "Shim");
    assert_eq!(patched["data"]["specs"], json!([]));
    assert_eq!(spec_count(&pool, catalog).await, 0);
}

#[tokio::test]
async fn unknown_child_reference_rolls_back_everything() {
    let Some((app, pool)) = setup().await else { return };
    let red = create(&app, "/api/v1/catalog/color/", json!({"name_uz": "Qizil"})).await;
    let catalog = create(
        &app,
        "/api/v1/catalog/catalog/",
        catalog_body("Kurtka", json!([spec("K-1", "300", red)])),
    )
    .await;

    let uri = format!("/api/v1/catalog/catalog/{}/", catalog);
    let (status, body) = call(
        &app,
        Method::PUT,
        &uri,
        Some(catalog_body(
            "Palto",
            json!([
                spec("P-1", "10", red),
                spec("P-2", "10", i64::MAX),
            ]),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["specs"][0], json!({}));
    assert_eq!(
        body["error"]["details"]["specs"][1]["color"],
        json!([format!("Invalid pk \"{}\" - object does not exist.", i64::MAX)])
    );

    let (_, fetched) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(fetched["data"]["name_uz"], "Kurtka");
    assert_eq!(fetched["data"]["specs"][0]["vendor_code"], "K-1");
    assert_eq!(spec_count(&pool, catalog).await, 1);
}

#[tokio::test]
async fn color_in_use_cannot_be_deleted() {
    let Some((app, _pool)) = setup().await else { return };
    let red = create(&app, "/api/v1/catalog/color/", json!({"name_uz": "Qizil"})).await;
    create(
        &app,
        "/api/v1/catalog/catalog/",
        catalog_body("Ko'ylak", json!([spec("C-1", "1", red)])),
    )
    .await;
    let (status, _) = call(&app, Method::DELETE, &format!("/api/v1/catalog/color/{}/", red), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let unused = create(&app, "/api/v1/catalog/color/", json!({"name_uz": "Yashil"})).await;
    let (status, _) = call(&app, Method::DELETE, &format!("/api/v1/catalog/color/{}/", unused), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn missing_translation_falls_back_to_uzbek() {
    let Some((app, _pool)) = setup().await else { return };
    let id = create(&app, "/api/v1/catalog/color/", json!({"name_uz": "Ko'k", "name_en": "Blue"})).await;
    let uri = format!("/api/v1/catalog/color/{}/", id);
    let (_, ru) = call_in(&app, Method::GET, &uri, None, Some("ru")).await;
    assert_eq!(ru["data"]["name"], "Ko'k");
    let (_, en) = call_in(&app, Method::GET, &uri, None, Some("en-US,en;q=0.9")).await;
    assert_eq!(en["data"]["name"], "Blue");
}

#[tokio::test]
async fn accepting_an_application_is_idempotent() {
    let Some((app, _pool)) = setup().await else { return };
    let id = create(
        &app,
        "/api/v1/shopping/apply/",
        json!({"full_name": "Ali Valiyev", "phone": "+998901234567"}),
    )
    .await;
    let uri = format!("/api/v1/shopping/accept/application/{}/", id);
    let (status, first) = call(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["is_accepted"], true);
    let (_, second) = call(&app, Method::POST, &uri, None).await;
    assert_eq!(first["data"]["accepted_at"], second["data"]["accepted_at"]);

    let (status, _) = call(&app, Method::POST, "/api/v1/shopping/accept/application/0/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn create_news(app: &Router, title: &str, draft: bool) -> i64 {
    create(
        app,
        "/api/v1/content/news/",
        json!({
            "title_uz": title,
            "description_uz": "Qisqacha",
            "content_uz": "Matn",
            "is_draft": draft,
        }),
    )
    .await
}

#[tokio::test]
async fn public_news_views_hide_drafts() {
    let Some((app, _pool)) = setup().await else { return };
    let mut published = Vec::new();
    for i in 0..4 {
        published.push(create_news(&app, &format!("Yangilik {}", i), false).await);
    }
    let draft = create_news(&app, "Qoralama", true).await;

    let (status, landing) = call(&app, Method::GET, "/api/v1/content/news/landing-page/", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = landing["data"].as_array().unwrap().iter().map(|n| n["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, [published[3], published[2], published[1]]);

    let detail = |id: i64| format!("/api/v1/content/news/landing-page/{}/", id);
    let (status, _) = call(&app, Method::GET, &detail(draft), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, news) = call(&app, Method::GET, &detail(published[0]), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(news["data"]["title"], "Yangilik 0");

    let (status, page) = call(&app, Method::GET, "/api/v1/content/news/page/?page_size=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["meta"]["page_size"], 2);
    assert!(page["data"].as_array().unwrap().iter().all(|n| n["id"] != json!(draft)));
}

#[tokio::test]
async fn page_past_the_end_is_not_found() {
    let Some((app, _pool)) = setup().await else { return };
    create_news(&app, "Sahifa", false).await;
    let (status, body) = call(&app, Method::GET, "/api/v1/content/news/page/?page=1000000", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]["message"].as_str().unwrap().contains("Invalid page."));
}

#[tokio::test]
async fn product_search_shows_only_active_specifications() {
    let Some((app, _pool)) = setup().await else { return };
    let red = create(&app, "/api/v1/catalog/color/", json!({"name_uz": "Qizil"})).await;
    let name = format!("Sviter {}", token());
    let mut off = spec("OFF", "10", red);
    off["is_active"] = json!(false);
    create(&app, "/api/v1/catalog/catalog/", catalog_body(&name, json!([spec("ON", "10", red), off]))).await;

    let (status, found) = call(&app, Method::GET, &format!("/api/v1/catalog/search/?search={}", &name[7..]), None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = found["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], name);
    let specs = rows[0]["specs"].as_array().unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0]["vendor_code"], "ON");
}

#[tokio::test]
async fn specification_links_and_miniature_round_trip() {
    let Some((app, pool)) = setup().await else { return };
    let file: i64 = sqlx::query_scalar(r#"INSERT INTO "files" ("path", "name") VALUES ('media/rasm.jpg', 'rasm') RETURNING "id""#)
        .fetch_one(&pool)
        .await
        .unwrap();
    let red = create(&app, "/api/v1/catalog/color/", json!({"name_uz": "Qizil"})).await;
    let size = create(&app, "/api/v1/catalog/size/", json!({"name_uz": "L", "size_type": "clothes"})).await;
    let catalog = create(
        &app,
        "/api/v1/catalog/catalog/",
        catalog_body(
            "Ko'ylak",
            json!([
                {"vendor_code": "M-1", "price": "5", "color": red, "size": [size], "files": [file], "miniature": ""},
                {"vendor_code": "M-2", "price": "6", "color": red, "size": [], "files": [], "miniature": file},
            ]),
        ),
    )
    .await;

    let (status, fetched) = call(&app, Method::GET, &format!("/api/v1/catalog/catalog/{}/", catalog), None).await;
    assert_eq!(status, StatusCode::OK);
    let specs = fetched["data"]["specs"].as_array().unwrap();
    let by_code = |code: &str| specs.iter().find(|s| s["vendor_code"] == code).unwrap();

    let first = by_code("M-1");
    assert_eq!(first["miniature"], Value::Null);
    assert_eq!(first["size"][0]["id"], json!(size));
    assert_eq!(first["files"][0]["path"], "media/rasm.jpg");

    let second = by_code("M-2");
    assert_eq!(second["miniature"], "media/rasm.jpg");
    assert_eq!(second["size"], json!([]));
}
