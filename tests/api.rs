//! HTTP-level tests: the full router over the in-memory store.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use envelope_sdk::{app, config::parse, resolve, AppState, EntityStore, MemoryStore, Settings, StaticAuthenticator};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const CONFIG: &str = r#"{
    "entities": [
        {
            "typeName": "common\\models\\Clerk",
            "table": "clerk",
            "attributes": ["name"],
            "validation": { "name": { "required": true } }
        },
        {
            "typeName": "common\\models\\Order",
            "table": "orders",
            "ownerAttribute": "kuserId",
            "softDeleteAttribute": "deleted",
            "attributes": ["title"],
            "references": ["common\\models\\Clerk"]
        },
        { "typeName": "Report", "table": "report", "operations": ["index", "view"] }
    ],
    "users": [
        { "username": "alice", "password": "a", "userId": 1 },
        { "username": "bob", "password": "b", "userId": 2 }
    ]
}"#;

fn test_app() -> Router {
    test_app_with_store(Arc::new(MemoryStore::new()))
}

fn test_app_with_store(store: Arc<MemoryStore>) -> Router {
    let config = parse(CONFIG).unwrap();
    let registry = resolve(&config).unwrap();
    let state = AppState::new(
        store,
        registry,
        Arc::new(StaticAuthenticator::new(&config.users)),
        Settings::default(),
    );
    app(state)
}

fn basic(user: &str, password: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{}:{}", user, password)))
}

async fn call(app: &Router, method: Method, uri: &str, user: Option<(&str, &str)>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((u, p)) = user {
        builder = builder.header(header::AUTHORIZATION, basic(u, p));
    }
    let request = match body {
        Some(b) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

const ALICE: Option<(&str, &str)> = Some(("alice", "a"));
const BOB: Option<(&str, &str)> = Some(("bob", "b"));

#[tokio::test]
async fn health_is_public() {
    let (status, body) = call(&test_app(), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unknown_route_becomes_not_found_envelope() {
    let (status, body) = call(&test_app(), Method::GET, "/nope/deeper/still", ALICE, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "code": -4, "message": "requested object does not exist" }));

    let (status, body) = call(&test_app(), Method::GET, "/widgets", ALICE, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], -4);
}

#[tokio::test]
async fn missing_credentials_become_unauthorized_envelope() {
    let (status, body) = call(&test_app(), Method::GET, "/clerks", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "code": -2, "message": "authentication information invalid" }));

    let (_, body) = call(&test_app(), Method::GET, "/clerks", Some(("alice", "wrong")), None).await;
    assert_eq!(body["code"], -2);
}

#[tokio::test]
async fn create_then_view_by_key_and_alias() {
    let app = test_app();
    let (status, body) = call(&app, Method::POST, "/clerks", ALICE, Some(json!({ "name": "Ann", "sid": "c-ann" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["message"], "success");
    assert_eq!(body["data"]["clerk"]["id"], 1);

    let (_, by_key) = call(&app, Method::GET, "/clerks/1", ALICE, None).await;
    assert_eq!(by_key["data"]["clerk"]["name"], "Ann");
    let (_, by_leading_zero) = call(&app, Method::GET, "/clerks/001", ALICE, None).await;
    assert_eq!(by_leading_zero["data"]["clerk"]["sid"], "c-ann");
    let (_, by_alias) = call(&app, Method::GET, "/clerks/c-ann", ALICE, None).await;
    assert_eq!(by_alias["data"]["clerk"]["id"], 1);

    let (status, missing) = call(&app, Method::GET, "/clerks/999", ALICE, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(missing, json!({ "code": -1, "message": "id target object does not exist" }));
}

#[tokio::test]
async fn validation_failure_reports_first_errors() {
    let (_, body) = call(&test_app(), Method::POST, "/clerks", ALICE, Some(json!({ "sid": "x" }))).await;
    assert_eq!(body["code"], -1);
    let errors: Value = serde_json::from_str(body["message"].as_str().unwrap()).unwrap();
    assert_eq!(errors, json!({ "name": "name cannot be blank" }));
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn index_wraps_list_and_pages() {
    let app = test_app();
    for name in ["a", "b", "c"] {
        call(&app, Method::POST, "/clerks", ALICE, Some(json!({ "name": name }))).await;
    }
    let (_, all) = call(&app, Method::GET, "/clerks", ALICE, None).await;
    assert_eq!(all["message"], "query succeeded");
    assert_eq!(all["data"]["count"], 3);
    assert_eq!(all["data"]["clerks"].as_array().unwrap().len(), 3);

    let (_, page) = call(&app, Method::GET, "/clerks?page=1&pageSize=2", ALICE, None).await;
    assert_eq!(page["data"]["count"], 1);
    assert_eq!(page["data"]["clerks"][0]["name"], "c");

    let (_, filtered) = call(&app, Method::GET, "/clerks?name=b", ALICE, None).await;
    assert_eq!(filtered["data"]["count"], 1);
}

#[tokio::test]
async fn references_owner_and_soft_delete() {
    let app = test_app();
    call(&app, Method::POST, "/clerks", ALICE, Some(json!({ "name": "Ann", "sid": "c-ann" }))).await;

    let (_, created) = call(
        &app,
        Method::POST,
        "/orders",
        ALICE,
        Some(json!({ "title": "box", "clerkSid": "c-ann", "kuserId": 99 })),
    )
    .await;
    assert_eq!(created["code"], 0);
    let order = &created["data"]["order"];
    assert_eq!(order["clerkId"], 1);
    assert_eq!(order["kuserId"], 1);
    assert_eq!(order["deleted"], 0);

    let (_, bad_ref) = call(&app, Method::POST, "/orders", ALICE, Some(json!({ "title": "x", "clerkSid": "ghost" }))).await;
    assert_eq!(bad_ref, json!({ "code": -1, "message": "clerkSid target object does not exist" }));

    let (_, foreign) = call(&app, Method::PUT, "/orders/1", BOB, Some(json!({ "title": "mine now" }))).await;
    assert_eq!(foreign, json!({ "code": -2, "message": "cannot modify data owned by another user" }));
    let (_, foreign) = call(&app, Method::DELETE, "/orders/1", BOB, None).await;
    assert_eq!(foreign["code"], -2);

    let (_, updated) = call(&app, Method::PATCH, "/orders/1", ALICE, Some(json!({ "title": "crate" }))).await;
    assert_eq!(updated["data"]["order"]["title"], "crate");

    let (_, deleted) = call(&app, Method::DELETE, "/orders/1", ALICE, None).await;
    assert_eq!(deleted, json!({ "code": 0, "message": "success" }));
    let (_, gone) = call(&app, Method::GET, "/orders/1", ALICE, None).await;
    assert_eq!(gone["message"], "id target object does not exist");
    let (_, listed) = call(&app, Method::GET, "/orders", ALICE, None).await;
    assert_eq!(listed["data"]["count"], 0);
}

#[tokio::test]
async fn rows_without_owner_are_writable_by_any_user() {
    let store = Arc::new(MemoryStore::new());
    let registry = resolve(&parse(CONFIG).unwrap()).unwrap();
    let order = registry.by_type("common\\models\\Order").unwrap();
    let seed = json!({ "title": "legacy", "deleted": 0 }).as_object().cloned().unwrap();
    store.insert(order, &seed).await.unwrap();
    let app = test_app_with_store(store);

    let (_, updated) = call(&app, Method::PATCH, "/orders/1", ALICE, Some(json!({ "title": "claimed" }))).await;
    assert_eq!(updated["code"], 0);
    assert_eq!(updated["data"]["order"]["title"], "claimed");

    let (_, deleted) = call(&app, Method::DELETE, "/orders/1", BOB, None).await;
    assert_eq!(deleted, json!({ "code": 0, "message": "success" }));
}

#[tokio::test]
async fn disabled_operation_is_left_as_405() {
    let (status, body) = call(&test_app(), Method::POST, "/reports", ALICE, Some(json!({}))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["status"], 405);
}

#[tokio::test]
async fn malformed_body_becomes_invalid_param() {
    let app = test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/clerks")
        .header(header::AUTHORIZATION, basic("alice", "a"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ nope"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], -1);
}
