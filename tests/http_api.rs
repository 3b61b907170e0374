mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{start_time, FakeAssets};
use labops::models::TEAM_MEMBER;
use labops::store::{DocumentStore, MemoryStore, NewDocument};
use labops::utils::{create_token, FixedClock};
use labops::{create_router, AppState, InventoryService};

const SECRET: &str = "test-secret";
const BOUNDARY: &str = "labopsboundary";

struct App {
    router: Router,
    store: Arc<MemoryStore>,
}

fn app() -> App {
    let store = Arc::new(MemoryStore::new());
    let service = InventoryService::new(store.clone())
        .with_clock(Arc::new(FixedClock::at(start_time())))
        .with_assets(Arc::new(FakeAssets::default()));
    let state = AppState::new(service, store.clone(), SECRET);
    App {
        router: create_router(state, &std::env::temp_dir()),
        store,
    }
}

fn multipart(fields: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    body
}

fn form_request(uri: &str, fields: &[(&str, &str)], cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = cookie {
        builder = builder.header(header::COOKIE, format!("auth_token={}", token));
    }
    builder.body(Body::from(multipart(fields))).unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &App, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create_tips(app: &App) -> Value {
    let (status, body) = send(
        app,
        form_request(
            "/api/items",
            &[
                ("name", "Pipette tips"),
                ("location", "Shelf A"),
                ("category", "General"),
                ("barcode", "0042"),
                ("stock", "10"),
                ("min_stock", "5"),
                ("owner", "lab-stock"),
            ],
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

#[tokio::test]
async fn create_then_fetch_item() {
    let app = app();

    let created = create_tips(&app).await;
    assert_eq!(created["itemId"], "LAB-1000");
    assert_eq!(created["status"], "In Stock");
    assert!(created.get("owner").is_none());

    let (status, fetched) = send(&app, get("/api/items/LAB-1000")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["_id"], created["_id"]);
    assert_eq!(fetched["minStock"], 5);

    let (status, scanned) = send(&app, get("/api/barcodes/0042")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scanned["itemId"], "LAB-1000");
}

#[tokio::test]
async fn receive_by_barcode_returns_new_stock_and_logs_member_name() {
    let app = app();
    create_tips(&app).await;
    let member = app
        .store
        .create(NewDocument::new(TEAM_MEMBER, json!({ "name": "Priya Shah" })))
        .await
        .unwrap();
    let token = create_token(SECRET, &member.id, "priya@lab.org".to_string(), None).unwrap();

    let (status, change) = send(
        &app,
        form_request("/api/barcodes/0042/receive", &[("quantity", "5")], Some(&token)),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", change);
    assert_eq!(change, json!({ "itemId": "LAB-1000", "stock": 15, "status": "In Stock" }));

    let (status, log) = send(&app, get("/api/activity?date=2026-10-16")).await;
    assert_eq!(status, StatusCode::OK);
    let events = log["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["user"], "Unknown");
    assert_eq!(events[1]["user"], "Priya Shah");
    assert_eq!(events[1]["action"], "receive_stock");
}

#[tokio::test]
async fn errors_map_to_statuses_with_messages() {
    let app = app();
    create_tips(&app).await;

    let (status, body) = send(&app, get("/api/items/LAB-9999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("LAB-9999"));

    let (status, body) = send(&app, json_request("/api/items/LAB-1000/approve", json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        json_request("/api/items/LAB-1000/stock", json!({ "stock": -4 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(&app, get("/api/ids/next?category=Reagents")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Reagents"));

    let (status, _) = send(&app, get("/api/activity?date=yesterday")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reorder_and_approve_over_http() {
    let app = app();
    create_tips(&app).await;
    send(&app, json_request("/api/items/LAB-1000/stock", json!({ "stock": 2 }))).await;

    let (status, requested) =
        send(&app, json_request("/api/items/LAB-1000/reorder", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(requested["status"], "Requested");
    assert_eq!(requested["requestedQuantity"], 3);

    let (status, ordered) =
        send(&app, json_request("/api/items/LAB-1000/approve", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ordered["status"], "Ordered");
}

#[tokio::test]
async fn notes_owner_and_lookups() {
    let app = app();
    create_tips(&app).await;
    let member = app
        .store
        .create(NewDocument::new(TEAM_MEMBER, json!({ "name": "Ari" })))
        .await
        .unwrap();

    let (status, note) = send(
        &app,
        json_request("/api/items/LAB-1000/notes", json!({ "content": "lid cracked" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(note["author"], "Guest");

    let (status, owned) = send(
        &app,
        json_request("/api/items/LAB-1000/owner", json!({ "owner": member.id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(owned["owner"]["_ref"], json!(member.id));

    let (status, shared) = send(
        &app,
        json_request("/api/items/LAB-1000/owner", json!({ "owner": "lab-stock" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(shared.get("owner").is_none());

    let (_, members) = send(&app, get("/api/members")).await;
    assert_eq!(members, json!([{ "id": member.id, "name": "Ari" }]));

    let (_, locations) = send(&app, get("/api/locations")).await;
    assert_eq!(locations, json!(["Shelf A"]));

    let (_, next) = send(&app, get("/api/ids/next?category=general")).await;
    assert_eq!(next["id"], "LAB-1001");
}
