//! Backend error taxonomy and its HTTP rendering.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use serde_json::{Map, Value, json};

use crate::models::FieldError;

pub const INTERNAL_ERROR_MESSAGE: &str =
    "An unexpected error occurred while processing your request";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The LLM provider rejected or failed the call.
    #[error("{message}")]
    OpenRouter {
        message: String,
        status_code: Option<u16>,
        response_data: Option<Value>,
    },

    #[error("{message}")]
    DocumentProcessing {
        message: String,
        file_type: Option<String>,
    },

    /// A semantic check failed after the request was parsed.
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
        value: Option<String>,
    },

    /// The request body did not match the expected shape.
    #[error("Request validation failed")]
    RequestValidation { details: Vec<FieldError> },

    #[error("{message}")]
    ServiceUnavailable {
        message: String,
        service_name: Option<String>,
    },

    #[error("{message}")]
    RateLimit {
        message: String,
        /// Seconds.
        retry_after: Option<u64>,
    },

    #[error("{message}")]
    Authentication { message: String },

    #[error("{message}")]
    Configuration {
        message: String,
        config_key: Option<String>,
    },

    #[error("{message}")]
    TextProcessing {
        message: String,
        text_length: Option<usize>,
    },

    #[error("{message}")]
    LearningPathGeneration {
        message: String,
        goals: Option<String>,
        skill_level: Option<String>,
    },

    /// A plain HTTP status raised by a route.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("{message}")]
    Internal { message: String },
}

impl ServiceError {
    pub fn open_router(message: impl Into<String>) -> Self {
        ServiceError::OpenRouter {
            message: message.into(),
            status_code: None,
            response_data: None,
        }
    }

    pub fn validation(message: impl Into<String>, field: &str, value: Option<String>) -> Self {
        ServiceError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
            value,
        }
    }

    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        ServiceError::Http {
            status: status.as_u16(),
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        ServiceError::Internal {
            message: INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }

    /// True for failures raised by the LLM provider integration, which
    /// services pass through unchanged.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            ServiceError::OpenRouter { .. }
                | ServiceError::RateLimit { .. }
                | ServiceError::Authentication { .. }
                | ServiceError::ServiceUnavailable { .. }
                | ServiceError::Configuration { .. }
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::OpenRouter { .. } => "OPENROUTER_API_ERROR",
            ServiceError::DocumentProcessing { .. } => "DOCUMENT_PROCESSING_ERROR",
            ServiceError::Validation { .. } | ServiceError::RequestValidation { .. } => {
                "VALIDATION_ERROR"
            }
            ServiceError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            ServiceError::RateLimit { .. } => "RATE_LIMIT_ERROR",
            ServiceError::Authentication { .. } => "AUTHENTICATION_ERROR",
            ServiceError::Configuration { .. } => "CONFIGURATION_ERROR",
            ServiceError::TextProcessing { .. } => "TEXT_PROCESSING_ERROR",
            ServiceError::LearningPathGeneration { .. } => "LEARNING_PATH_ERROR",
            ServiceError::Http { .. } => "HTTP_ERROR",
            ServiceError::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::OpenRouter { status_code, .. } => status_code
                .and_then(|code| StatusCode::from_u16(code).ok())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            ServiceError::DocumentProcessing { .. }
            | ServiceError::RequestValidation { .. }
            | ServiceError::TextProcessing { .. }
            | ServiceError::LearningPathGeneration { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Validation { .. } => StatusCode::BAD_REQUEST,
            ServiceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            ServiceError::Configuration { .. } | ServiceError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::Http { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Structured context; `None` for variants that carry none.
    pub fn details(&self) -> Option<Value> {
        match self {
            ServiceError::OpenRouter {
                status_code,
                response_data,
                ..
            } => Some(json!({"status_code": status_code, "response_data": response_data})),
            ServiceError::DocumentProcessing { file_type, .. } => {
                Some(json!({"file_type": file_type}))
            }
            ServiceError::Validation { field, value, .. } => {
                Some(json!({"field": field, "value": value}))
            }
            ServiceError::RequestValidation { details } => Some(json!(details)),
            ServiceError::ServiceUnavailable { service_name, .. } => {
                Some(json!({"service_name": service_name}))
            }
            ServiceError::RateLimit { retry_after, .. } => {
                Some(json!({"retry_after": retry_after}))
            }
            ServiceError::Authentication { .. } => Some(json!({})),
            ServiceError::Configuration { config_key, .. } => {
                Some(json!({"config_key": config_key}))
            }
            ServiceError::TextProcessing { text_length, .. } => {
                Some(json!({"text_length": text_length}))
            }
            ServiceError::LearningPathGeneration {
                goals, skill_level, ..
            } => Some(json!({"goals": goals, "skill_level": skill_level})),
            ServiceError::Http { .. } | ServiceError::Internal { .. } => None,
        }
    }

    /// JSON error body as served to clients.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("error".into(), json!(self.error_code()));
        body.insert("message".into(), json!(self.to_string()));
        if let Some(details) = self.details() {
            body.insert("details".into(), details);
        }
        match self {
            ServiceError::RateLimit {
                retry_after: Some(retry_after),
                ..
            } => {
                body.insert("retry_after".into(), json!(retry_after));
            }
            ServiceError::Http { status, .. } => {
                body.insert("status_code".into(), json!(status));
            }
            _ => {}
        }
        body.insert("timestamp".into(), json!(chrono::Utc::now().to_rfc3339()));
        Value::Object(body)
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{} ({}): {}", self.error_code(), status.as_u16(), self);
        } else {
            warn!("{} ({}): {}", self.error_code(), status.as_u16(), self);
        }
        (status, Json(self.to_body())).into_response()
    }
}
