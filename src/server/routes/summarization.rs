use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::info;
use serde_json::Value;

use super::service_health;
use crate::error::ServiceError;
use crate::models::{SummarizationRequest, SummarizationResponse};
use crate::server::{AppState, ValidatedJson};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/summarize", post(summarize))
        .route("/api/summarize/health", get(health))
}

async fn summarize(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SummarizationRequest>,
) -> Result<Json<SummarizationResponse>, ServiceError> {
    info!(
        "Received summarization request: {} characters, style {}",
        request.text.chars().count(),
        request.style()
    );
    let response = state
        .summarization
        .summarize(&request.text, request.max_length(), request.style())
        .await?;
    info!(
        "Summarized {} characters into {} (ratio {:.2})",
        response.original_length, response.summary_length, response.compression_ratio
    );
    Ok(Json(response))
}

async fn health(State(state): State<AppState>) -> Result<Json<Value>, ServiceError> {
    service_health(
        state.summarization.health_check().await,
        "summarization",
        "Summarization",
    )
}
