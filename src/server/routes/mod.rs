mod learning_path;
mod qa;
mod summarization;
mod system;

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use serde_json::{Value, json};

use super::AppState;
use crate::error::ServiceError;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(system::router())
        .merge(summarization::router())
        .merge(qa::router())
        .merge(learning_path::router())
        .fallback(not_found)
}

async fn not_found() -> ServiceError {
    ServiceError::http(StatusCode::NOT_FOUND, "Not Found")
}

/// Body of a per-service health endpoint; 503 when the probe failed.
fn service_health(healthy: bool, service: &str, label: &str) -> Result<Json<Value>, ServiceError> {
    if healthy {
        Ok(Json(json!({
            "status": "healthy",
            "service": service,
            "message": format!("{} service is working properly", label),
        })))
    } else {
        Err(ServiceError::http(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("{} service is not responding properly", label),
        ))
    }
}
