use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::info;
use serde_json::Value;

use super::service_health;
use crate::error::ServiceError;
use crate::models::{
    LearningPathOptions, LearningPathRequest, LearningPathResponse, LearningPathValidation,
};
use crate::server::{AppState, ValidatedJson};
use crate::services::LearningPathService;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/learning-path", post(generate))
        .route("/api/learning-path/options", get(options))
        .route("/api/learning-path/validate", post(validate))
        .route("/api/learning-path/health", get(health))
}

async fn generate(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LearningPathRequest>,
) -> Result<Json<LearningPathResponse>, ServiceError> {
    info!(
        "Received learning path request for {} level, {} duration",
        request.skill_level, request.duration
    );
    let path = state
        .learning_path
        .generate_path(
            &request.goals,
            request.skill_level,
            request.duration,
            &request.focus_areas,
        )
        .await?;
    Ok(Json(path))
}

async fn options() -> Json<LearningPathOptions> {
    Json(LearningPathOptions::all())
}

async fn validate(
    ValidatedJson(request): ValidatedJson<LearningPathRequest>,
) -> Json<LearningPathValidation> {
    Json(LearningPathService::validate_request(&request))
}

async fn health(State(state): State<AppState>) -> Result<Json<Value>, ServiceError> {
    service_health(
        state.learning_path.health_check().await,
        "learning-path",
        "Learning path",
    )
}
