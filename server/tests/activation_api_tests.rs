use std::sync::Arc;
use tether_license::{
    ActivationResponse, ActivationService, EncodedLicense, ErrorResponse, Package, ServiceConfig,
    SharedKey, decode,
};
use tether_server::build_router;

const MACHINE: &str = "9b1d5c7e2f4a6b8c0d2e4f6a8b0c2d4e";

fn test_key() -> SharedKey {
    SharedKey::from_bytes([5u8; 32])
}

/// Spin up the HTTP server on an OS-assigned port, returning the base URL.
async fn spawn_test_server() -> String {
    let service = ActivationService::new(ServiceConfig::default(), test_key());
    let app = build_router(Arc::new(service));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

async fn post_activate(base: &str, body: serde_json::Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/activate", base))
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn activate_returns_sealed_license() {
    let base = spawn_test_server().await;
    let resp = post_activate(
        &base,
        serde_json::json!({"machine_id": MACHINE, "package": "3M"}),
    )
    .await;

    assert_eq!(resp.status(), 200);
    let body: ActivationResponse = resp.json().await.unwrap();
    let blob = EncodedLicense::from_base64(&body.license).unwrap();
    let license = decode(&blob, &test_key()).unwrap();
    assert_eq!(license.machine_fingerprint.as_str(), MACHINE);
    assert_eq!(license.package, Package::ThreeMonths);
}

#[tokio::test]
async fn activate_content_type_is_json() {
    let base = spawn_test_server().await;
    let resp = post_activate(
        &base,
        serde_json::json!({"machine_id": MACHINE, "package": "PERM"}),
    )
    .await;

    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.contains("application/json"));
}

#[tokio::test]
async fn unknown_package_is_400() {
    let base = spawn_test_server().await;
    let resp = post_activate(
        &base,
        serde_json::json!({"machine_id": MACHINE, "package": "XYZ"}),
    )
    .await;

    assert_eq!(resp.status(), 400);
    let body: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(body.error, "Invalid package");
}

#[tokio::test]
async fn trial_package_is_400() {
    let base = spawn_test_server().await;
    let resp = post_activate(
        &base,
        serde_json::json!({"machine_id": MACHINE, "package": "TRIAL"}),
    )
    .await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn short_machine_id_is_400() {
    let base = spawn_test_server().await;
    let resp = post_activate(
        &base,
        serde_json::json!({"machine_id": "abc", "package": "1M"}),
    )
    .await;

    assert_eq!(resp.status(), 400);
    let body: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(body.error, "Invalid machine_id");
}

#[tokio::test]
async fn missing_machine_id_is_400() {
    let base = spawn_test_server().await;
    let resp = post_activate(&base, serde_json::json!({"package": "1M"})).await;

    assert_eq!(resp.status(), 400);
    let body: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(body.error, "Invalid machine_id");
}

#[tokio::test]
async fn non_string_machine_id_is_invalid_machine_id() {
    let base = spawn_test_server().await;
    let resp = post_activate(
        &base,
        serde_json::json!({"machine_id": 123456789, "package": "1M"}),
    )
    .await;

    assert_eq!(resp.status(), 400);
    let body: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(body.error, "Invalid machine_id");
}

#[tokio::test]
async fn non_string_package_is_invalid_package() {
    let base = spawn_test_server().await;
    let resp = post_activate(
        &base,
        serde_json::json!({"machine_id": MACHINE, "package": 3}),
    )
    .await;

    assert_eq!(resp.status(), 400);
    let body: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(body.error, "Invalid package");
}

#[tokio::test]
async fn empty_or_non_object_body_is_invalid_json() {
    let base = spawn_test_server().await;
    for body in [
        serde_json::json!({}),
        serde_json::json!(null),
        serde_json::json!([]),
        serde_json::json!(["machine_id", MACHINE]),
    ] {
        let resp = post_activate(&base, body.clone()).await;
        assert_eq!(resp.status(), 400, "body {body}");
        let err: ErrorResponse = resp.json().await.unwrap();
        assert_eq!(err.error, "Invalid JSON", "body {body}");
    }
}

#[tokio::test]
async fn malformed_json_is_400() {
    let base = spawn_test_server().await;
    let resp = reqwest::Client::new()
        .post(format!("{}/activate", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(body.error, "Invalid JSON");
}

#[tokio::test]
async fn health_endpoint() {
    let base = spawn_test_server().await;
    let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let base = spawn_test_server().await;
    let resp = reqwest::get(format!("{}/api/v1/nonexistent", base))
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn get_on_activate_is_405() {
    let base = spawn_test_server().await;
    let resp = reqwest::get(format!("{}/activate", base)).await.unwrap();
    assert_eq!(resp.status(), 405);
}
