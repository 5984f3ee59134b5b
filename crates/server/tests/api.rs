use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use engine::{Engine, Sensor, SimulatedSensor};
use migration::MigratorTrait;
use server::{ServerState, router};

async fn test_router(name: &str) -> (Router, SimulatedSensor) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    let root =
        std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_server");
    std::fs::create_dir_all(&root).unwrap();
    let labels = root.join(format!("{name}.json"));
    let _ = std::fs::remove_file(&labels);

    let sensor = SimulatedSensor::new();
    let engine = Engine::builder()
        .database(db)
        .sensor(Sensor::Simulated(sensor.clone()))
        .labels_path(labels)
        .build()
        .unwrap();

    let state = ServerState {
        engine: Arc::new(engine),
    };
    (router(state), sensor)
}

async fn request(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_ok() {
    let (router, _) = test_router("health_reports_ok").await;
    let (status, body) = request(&router, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn user_crud_flow() {
    let (router, _) = test_router("user_crud_flow").await;

    let (status, body) = request(
        &router,
        "POST",
        "/api/users",
        Some(json!({"username": "alice", "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "alice");
    assert!(body["fingerprints"].as_array().unwrap().is_empty());

    let (status, body) = request(
        &router,
        "POST",
        "/api/users",
        Some(json!({"username": "alice", "password": "other"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("alice"));

    let (status, body) = request(&router, "GET", "/api/users/alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");

    let (status, _) = request(&router, "GET", "/api/users/nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = request(&router, "GET", "/api/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, body) = request(&router, "DELETE", "/api/users/alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");

    let (status, _) = request(&router, "GET", "/api/users/alice", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_validation_maps_to_422() {
    let (router, _) = test_router("user_validation_maps_to_422").await;

    let (status, _) = request(
        &router,
        "POST",
        "/api/users",
        Some(json!({"username": "ab", "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = request(
        &router,
        "POST",
        "/api/users",
        Some(json!({"username": "alice", "password": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn enrollment_flow() {
    let (router, _) = test_router("enrollment_flow").await;
    request(
        &router,
        "POST",
        "/api/users",
        Some(json!({"username": "alice", "password": "secret"})),
    )
    .await;

    // Default finger applies when the body names none.
    let (status, body) = request(&router, "POST", "/api/enrollment/alice", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["finger"], "right-index-finger");

    let (status, body) = request(
        &router,
        "POST",
        "/api/enrollment/alice",
        Some(json!({"finger": "left-thumb", "label": "garage"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["label"], "garage");

    let (status, body) = request(&router, "GET", "/api/enrollment/alice/fingers", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (status, body) = request(
        &router,
        "DELETE",
        "/api/enrollment/alice/left-thumb",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_finger"], "left-thumb");

    let (status, body) = request(&router, "DELETE", "/api/enrollment/alice/all", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_finger"], Value::Null);

    let (_, body) = request(&router, "GET", "/api/enrollment/alice/fingers", None).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn enrollment_rejects_unknown_finger() {
    let (router, _) = test_router("enrollment_rejects_unknown_finger").await;
    request(
        &router,
        "POST",
        "/api/users",
        Some(json!({"username": "alice", "password": "secret"})),
    )
    .await;

    let (status, _) = request(
        &router,
        "POST",
        "/api/enrollment/alice",
        Some(json!({"finger": "sixth-finger"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = request(
        &router,
        "POST",
        "/api/enrollment/nobody",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn enroll_new_user_creates_and_enrolls() {
    let (router, _) = test_router("enroll_new_user_creates_and_enrolls").await;

    let (status, body) = request(
        &router,
        "POST",
        "/api/enrollment/user",
        Some(json!({"username": "bob", "password": "secret", "label": "front door"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "bob");
    assert!(body.get("enrollment_error").is_none());

    let (_, body) = request(&router, "GET", "/api/enrollment/bob/fingers", None).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["enrolled_fingers"][0]["label"], "front door");

    let (status, _) = request(
        &router,
        "POST",
        "/api/enrollment/user",
        Some(json!({"username": "bob", "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn verification_grants_and_denies() {
    let (router, sensor) = test_router("verification_grants_and_denies").await;
    request(
        &router,
        "POST",
        "/api/enrollment/user",
        Some(json!({"username": "alice", "password": "secret"})),
    )
    .await;

    let (status, body) = request(
        &router,
        "POST",
        "/api/verification/alice",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["access_granted"], true);
    assert_eq!(body["user"]["username"], "alice");

    sensor.reject_user("alice").await;
    let (status, body) = request(
        &router,
        "POST",
        "/api/verification/alice",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["access_granted"], false);
    assert!(body.get("user").is_none());

    let (status, _) = request(
        &router,
        "POST",
        "/api/verification/nobody",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(
        &router,
        "POST",
        "/api/verification/alice",
        Some(json!({"finger": "sixth-finger"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn identification_walks_candidates() {
    let (router, sensor) = test_router("identification_walks_candidates").await;

    // Nobody enrolled yet.
    let (status, _) = request(&router, "POST", "/api/verification", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    request(
        &router,
        "POST",
        "/api/enrollment/user",
        Some(json!({"username": "alice", "password": "secret", "finger": "left-thumb"})),
    )
    .await;

    let (status, body) = request(&router, "POST", "/api/verification", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["finger"], "left-thumb");
    assert_eq!(body["verification_stats"]["users_checked"], 1);

    sensor.reject_user("alice").await;
    let (status, body) = request(&router, "POST", "/api/verification", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["access_granted"], false);
}

#[tokio::test]
async fn simulated_verification_is_scripted() {
    let (router, _) = test_router("simulated_verification_is_scripted").await;
    request(
        &router,
        "POST",
        "/api/users",
        Some(json!({"username": "alice", "password": "secret"})),
    )
    .await;

    let (status, body) = request(
        &router,
        "POST",
        "/api/verification/simulate",
        Some(json!({"username": "alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["simulated"], true);
    assert_eq!(body["access_granted"], true);

    let (status, body) = request(
        &router,
        "POST",
        "/api/verification/simulate",
        Some(json!({"username": "alice", "success": false})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["access_granted"], false);

    let (status, _) = request(
        &router,
        "POST",
        "/api/verification/simulate",
        Some(json!({"username": "nobody"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
