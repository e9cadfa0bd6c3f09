use serde::{Deserialize, Serialize};

use super::{FieldError, Validate, check_length, into_result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_text: Option<String>,
}

impl Validate for QaRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        check_length(&mut errors, "question", &self.question, 5, 500);
        into_result(errors)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaResponse {
    pub answer: String,
    /// Between 0.0 and 1.0.
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
}
