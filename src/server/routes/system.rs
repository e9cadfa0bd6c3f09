use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::server::AppState;

const SERVICE_NAME: &str = "AI Microservices API";
const VERSION: &str = env!("CARGO_PKG_VERSION");

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/info", get(info))
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "AI Microservices API is running",
        "status": "healthy",
        "version": VERSION,
        "timestamp": timestamp(),
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let mut body = json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": VERSION,
        "timestamp": timestamp(),
        "environment": {
            "api_key_configured": state.api_key_configured,
            "build": env!("AI_MICROSERVICES_BUILD_VERSION"),
        },
        "services": {
            "summarization": "available",
            "qa": "available",
            "learning_path": "available",
        },
    });
    if !state.api_key_configured {
        body["status"] = json!("degraded");
        body["warnings"] = json!(["OPENAI_API_KEY environment variable is not configured"]);
    }
    Json(body)
}

async fn info() -> Json<Value> {
    Json(json!({
        "name": SERVICE_NAME,
        "version": VERSION,
        "description": "Modular AI services for text summarization, document Q&A, and learning path generation",
        "endpoints": {
            "summarization": {
                "POST /api/summarize": "Summarize text content with customizable options",
                "GET /api/summarize/health": "Health check for summarization service",
            },
            "qa": {
                "POST /api/qa": "Answer questions based on uploaded documents",
                "POST /api/qa/text": "Answer questions based on direct text input",
                "GET /api/qa/health": "Health check for Q&A service",
            },
            "learning_path": {
                "POST /api/learning-path": "Generate personalized learning paths",
                "GET /api/learning-path/options": "Get available skill levels and durations",
                "POST /api/learning-path/validate": "Validate learning path request parameters",
                "GET /api/learning-path/health": "Health check for learning path service",
            },
            "system": {
                "GET /": "Basic status",
                "GET /health": "Comprehensive health check",
                "GET /api/info": "API information",
            },
        },
    }))
}
