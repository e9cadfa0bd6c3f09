//! Request and response types shared by the backend routes and the API client.
//!
//! Requests implement [`Validate`], which reports every field-level problem
//! at once rather than stopping at the first.

mod learning_path;
mod qa;
mod summarization;

use serde::{Deserialize, Serialize};

pub use learning_path::{
    GoalAnalysis, LearningPathOptions, LearningPathRequest, LearningPathResponse,
    LearningPathValidation, LearningPhase, PathDuration, PhasePlan, Resource, SkillLevel,
};
pub use qa::{QaRequest, QaResponse};
pub use summarization::{
    DEFAULT_MAX_LENGTH, SummarizationRequest, SummarizationResponse, SummaryStyle,
};

/// One failed field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>, kind: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            kind: kind.to_string(),
        }
    }
}

/// Structural validation of a deserialized request.
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

/// Checks a string's character count against inclusive bounds.
pub(crate) fn check_length(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) {
    let len = value.chars().count();
    if len < min {
        errors.push(FieldError::new(
            field,
            format!("String should have at least {} characters", min),
            "string_too_short",
        ));
    } else if len > max {
        errors.push(FieldError::new(
            field,
            format!("String should have at most {} characters", max),
            "string_too_long",
        ));
    }
}

/// Checks a number against inclusive bounds.
pub(crate) fn check_range<T>(errors: &mut Vec<FieldError>, field: &str, value: T, min: T, max: T)
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min {
        errors.push(FieldError::new(
            field,
            format!("Input should be greater than or equal to {}", min),
            "greater_than_equal",
        ));
    } else if value > max {
        errors.push(FieldError::new(
            field,
            format!("Input should be less than or equal to {}", max),
            "less_than_equal",
        ));
    }
}

pub(crate) fn into_result(errors: Vec<FieldError>) -> Result<(), Vec<FieldError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
