//! Integration Tests for API Endpoints
//!
//! Tests the full request/response cycle for each endpoint over the
//! in-memory store.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use redis_facade::{
    api::create_router,
    config::CacheProperties,
    store::{KeyValueStore, MemoryStore},
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> Router {
    create_app_with(Arc::new(MemoryStore::new()), &CacheProperties::default())
}

fn create_app_with(store: Arc<MemoryStore>, properties: &CacheProperties) -> Router {
    create_router(AppState::new(store, properties))
}

fn register_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/register")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(key: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/register/{}", key))
        .body(Body::empty())
        .unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// == Register Endpoint Tests ==

#[tokio::test]
async fn test_register_endpoint_success() {
    let app = create_test_app();

    let response = app
        .oneshot(register_request(r#"{"key":"user:1","value":"alice"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "Success");
}

#[tokio::test]
async fn test_register_empty_key_rejected() {
    let app = create_test_app();

    let response = app
        .oneshot(register_request(r#"{"key":"","value":"alice"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_register_malformed_body_rejected() {
    let app = create_test_app();

    let response = app
        .oneshot(register_request(r#"{"key":"k"}"#))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

// == Retrieve Endpoint Tests ==

#[tokio::test]
async fn test_register_then_retrieve() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(register_request(r#"{"key":"user:1","value":"alice"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_request("user:1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "user:1");
    assert_eq!(json["value"], "alice");
}

#[tokio::test]
async fn test_register_overwrites_previous_value() {
    let app = create_test_app();

    for value in ["first", "second"] {
        let body = format!(r#"{{"key":"k","value":"{}"}}"#, value);
        let response = app.clone().oneshot(register_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(get_request("k")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["value"], "second");
}

#[tokio::test]
async fn test_retrieve_missing_key_returns_null_value() {
    let app = create_test_app();

    let response = app.oneshot(get_request("missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "missing");
    assert!(json["value"].is_null());
}

#[tokio::test]
async fn test_records_stored_as_tagged_json_under_prefix() {
    let store = Arc::new(MemoryStore::new());
    let properties = CacheProperties {
        key_prefix: "app:".to_string(),
        ..Default::default()
    };
    let app = create_app_with(store.clone(), &properties);

    let response = app
        .oneshot(register_request(r#"{"key":"k","value":"v"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let raw = store.get("app:k").await.unwrap().unwrap();
    let stored: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored["@type"], "Record");
    assert_eq!(stored["payload"]["key"], "k");
    assert_eq!(stored["payload"]["value"], "v");
    assert!(store.get("k").await.unwrap().is_none());
}

#[tokio::test]
async fn test_record_expires_after_time_to_live() {
    let store = Arc::new(MemoryStore::new());
    let properties = CacheProperties {
        time_to_live: 1,
        ..Default::default()
    };
    let app = create_app_with(store.clone(), &properties);

    app.clone()
        .oneshot(register_request(r#"{"key":"short","value":"v"}"#))
        .await
        .unwrap();
    let ttl = store.ttl("short").await.unwrap();
    assert!(ttl <= Duration::from_secs(1));

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let response = app.oneshot(get_request("short")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert!(json["value"].is_null());
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["backend"], "memory");
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
