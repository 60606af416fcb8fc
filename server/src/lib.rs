//! HTTP API for the Tether activation service.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tether_license::{
    ACTIVATE_PATH, ActivationRequest, ActivationResponse, ActivationService, ErrorResponse,
    LicenseError,
};
use tracing::{error, warn};

/// Error answered by the API. Internal details are logged, never returned.
#[derive(Debug)]
pub enum ApiError {
    /// Request body is not the expected JSON (400).
    InvalidJson(String),
    /// Validation or internal failure from the license core.
    License(LicenseError),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::InvalidJson(_) => (StatusCode::BAD_REQUEST, "Invalid JSON".to_string()),
            Self::License(LicenseError::InvalidFingerprint(_)) => {
                (StatusCode::BAD_REQUEST, "Invalid machine_id".to_string())
            }
            Self::License(LicenseError::InvalidPackage(_)) => {
                (StatusCode::BAD_REQUEST, "Invalid package".to_string())
            }
            Self::License(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl From<LicenseError> for ApiError {
    fn from(err: LicenseError) -> Self {
        Self::License(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        match &self {
            Self::InvalidJson(detail) => warn!("invalid activation request: {detail}"),
            Self::License(err) if status.is_server_error() => {
                error!(error = %err, "activation failed")
            }
            Self::License(_) => {}
        }
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Lifts the raw body into an [`ActivationRequest`].
///
/// A body that is not JSON, or is JSON but empty or falsy (`{}`, `null`,
/// `[]`, `""`, `0`, `false`), or is not an object, is "Invalid JSON".
/// Non-string fields become empty strings and fail their own validation.
fn parse_request(body: Result<Json<Value>, JsonRejection>) -> Result<ActivationRequest, ApiError> {
    let Json(value) = body.map_err(|e| ApiError::InvalidJson(e.body_text()))?;
    let fields = match &value {
        Value::Object(map) if !map.is_empty() => map,
        _ => return Err(ApiError::InvalidJson("expected a non-empty JSON object".to_string())),
    };
    let text = |name: &str| {
        fields
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Ok(ActivationRequest {
        machine_id: text("machine_id"),
        package: text("package"),
    })
}

async fn activate_handler(
    State(service): State<Arc<ActivationService>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ActivationResponse>, ApiError> {
    let request = parse_request(body)?;
    let encoded = service.activate(&request)?;
    Ok(Json(ActivationResponse {
        license: encoded.to_base64(),
    }))
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the HTTP API router around an activation service.
pub fn build_router(service: Arc<ActivationService>) -> Router {
    Router::new()
        .route(ACTIVATE_PATH, post(activate_handler))
        .route("/health", get(health_handler))
        .with_state(service)
}
