use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::info;
use serde_json::Value;

use super::service_health;
use crate::error::ServiceError;
use crate::models::{FieldError, QaRequest, QaResponse};
use crate::server::{AppState, ValidatedJson};
use crate::services::QaService;

const MISSING_DOCUMENT: &str = "Either a document file or document_text must be provided";

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/qa", post(answer))
        .route("/api/qa/text", post(answer_text))
        .route("/api/qa/health", get(health))
}

struct Upload {
    filename: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// Accepts either a multipart form (`question` plus `file` or
/// `document_text`) or a JSON [`QaRequest`].
async fn answer(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<QaResponse>, ServiceError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let (question, document) = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ServiceError::http(StatusCode::BAD_REQUEST, e.body_text()))?;
        read_form(multipart).await?
    } else {
        let ValidatedJson(body) = ValidatedJson::<QaRequest>::from_request(request, &state).await?;
        let document = body
            .document_text
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ServiceError::http(StatusCode::BAD_REQUEST, MISSING_DOCUMENT))?;
        (body.question, document)
    };

    info!(
        "Received Q&A request: {}",
        question.chars().take(100).collect::<String>()
    );
    let response = state.qa.answer_question(&question, &document).await?;
    Ok(Json(response))
}

async fn read_form(mut multipart: Multipart) -> Result<(String, String), ServiceError> {
    let mut question = None;
    let mut document_text = None;
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::http(StatusCode::BAD_REQUEST, e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("question") => question = Some(field_text(field).await?),
            Some("document_text") => document_text = Some(field_text(field).await?),
            Some("file") => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServiceError::http(StatusCode::BAD_REQUEST, e.body_text()))?;
                upload = Some(Upload {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    let question = question.ok_or_else(|| ServiceError::RequestValidation {
        details: vec![FieldError::new("question", "Field required", "missing")],
    })?;

    let document = match upload {
        Some(upload) => read_upload(upload)?,
        None => document_text
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ServiceError::http(StatusCode::BAD_REQUEST, MISSING_DOCUMENT))?,
    };
    Ok((question, document))
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ServiceError> {
    field
        .text()
        .await
        .map_err(|e| ServiceError::http(StatusCode::BAD_REQUEST, e.body_text()))
}

fn read_upload(upload: Upload) -> Result<String, ServiceError> {
    if let Some(content_type) = upload.content_type.as_deref() {
        if !content_type.starts_with("text/") {
            return Err(ServiceError::http(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!(
                    "Unsupported file type: {}. Only text files are supported.",
                    content_type
                ),
            ));
        }
    }

    let file_type = upload.content_type.as_deref().unwrap_or("text/plain");
    let text = QaService::process_document(&upload.bytes, file_type)
        .map_err(|e| ServiceError::http(StatusCode::BAD_REQUEST, e.to_string()))?;
    info!(
        "Processed uploaded file: {}, size: {} bytes",
        upload.filename.as_deref().unwrap_or("<unnamed>"),
        upload.bytes.len()
    );
    Ok(text)
}

async fn answer_text(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<QaRequest>,
) -> Result<Json<QaResponse>, ServiceError> {
    let document = request.document_text.unwrap_or_default();
    let response = state
        .qa
        .answer_question(&request.question, &document)
        .await?;
    Ok(Json(response))
}

async fn health(State(state): State<AppState>) -> Result<Json<Value>, ServiceError> {
    service_health(state.qa.health_check().await, "qa", "Q&A")
}
