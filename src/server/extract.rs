use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::error::ServiceError;
use crate::models::{FieldError, Validate};

/// JSON body that has been deserialized and passed [`Validate`].
///
/// Both malformed bodies and constraint failures are rejected with a 422
/// `VALIDATION_ERROR` listing the offending fields.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::RequestValidation {
                details: vec![rejection_detail(&rejection)],
            })?;
        value
            .validate()
            .map_err(|details| ServiceError::RequestValidation { details })?;
        Ok(ValidatedJson(value))
    }
}

fn rejection_detail(rejection: &JsonRejection) -> FieldError {
    let kind = match rejection {
        JsonRejection::JsonDataError(_) => "value_error",
        JsonRejection::JsonSyntaxError(_) => "json_invalid",
        JsonRejection::MissingJsonContentType(_) => "missing_content_type",
        _ => "validation_error",
    };
    FieldError::new("body", rejection.body_text(), kind)
}
