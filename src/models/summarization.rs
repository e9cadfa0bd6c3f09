use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{FieldError, Validate, check_length, check_range, into_result};

/// Summary length in words when the request leaves it out.
pub const DEFAULT_MAX_LENGTH: u32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryStyle {
    #[default]
    Concise,
    Detailed,
    BulletPoints,
}

impl SummaryStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStyle::Concise => "concise",
            SummaryStyle::Detailed => "detailed",
            SummaryStyle::BulletPoints => "bullet-points",
        }
    }
}

impl fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SummaryStyle {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "concise" => Ok(SummaryStyle::Concise),
            "detailed" => Ok(SummaryStyle::Detailed),
            "bullet-points" => Ok(SummaryStyle::BulletPoints),
            _ => anyhow::bail!(
                "Unknown summary style: {}. Expected concise, detailed, or bullet-points.",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizationRequest {
    pub text: String,
    /// Maximum summary length in words.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<SummaryStyle>,
}

impl SummarizationRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            max_length: None,
            style: None,
        }
    }

    pub fn max_length(&self) -> u32 {
        self.max_length.unwrap_or(DEFAULT_MAX_LENGTH)
    }

    pub fn style(&self) -> SummaryStyle {
        self.style.unwrap_or_default()
    }
}

impl Validate for SummarizationRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        check_length(&mut errors, "text", &self.text, 10, 10_000);
        if let Some(max_length) = self.max_length {
            check_range(&mut errors, "max_length", max_length, 50, 500);
        }
        into_result(errors)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizationResponse {
    pub summary: String,
    /// Characters in the original text.
    pub original_length: usize,
    /// Characters in the summary.
    pub summary_length: usize,
    pub compression_ratio: f64,
}
