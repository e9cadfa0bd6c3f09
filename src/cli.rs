//! Client-side commands run against a live backend.

use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::api::ApiService;
use crate::http::Transport;
use crate::models::{
    LearningPathRequest, PathDuration, QaRequest, SkillLevel, SummarizationRequest, SummaryStyle,
};

/// Where command text comes from: given inline or read from a file.
#[derive(Debug, Clone, PartialEq)]
pub enum TextSource {
    Inline(String),
    File(PathBuf),
}

impl TextSource {
    pub fn from_args(text: Option<String>, file: Option<PathBuf>) -> Option<Self> {
        match (text, file) {
            (_, Some(path)) => Some(TextSource::File(path)),
            (Some(text), None) => Some(TextSource::Inline(text)),
            (None, None) => None,
        }
    }

    pub fn read(&self) -> Result<String> {
        match self {
            TextSource::Inline(text) => Ok(text.clone()),
            TextSource::File(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display())),
        }
    }
}

fn print_json<V: Serialize>(value: &V) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tracing::instrument(skip(api, source))]
pub async fn summarize<T: Transport>(
    api: &ApiService<T>,
    source: &TextSource,
    max_length: Option<u32>,
    style: Option<SummaryStyle>,
) -> Result<()> {
    let request = SummarizationRequest {
        text: source.read()?,
        max_length,
        style,
    };
    debug!("Summarizing {} characters", request.text.chars().count());
    let response = api.summarize_text(&request).await?;
    print_json(&response)
}

/// Asks a question about inline text, or uploads `document` when it is a file.
#[tracing::instrument(skip(api, question, document))]
pub async fn ask<T: Transport>(
    api: &ApiService<T>,
    question: &str,
    document: &TextSource,
) -> Result<()> {
    let response = match document {
        TextSource::Inline(text) => {
            let request = QaRequest {
                question: question.to_string(),
                document_text: Some(text.clone()),
            };
            api.answer_question(&request).await?
        }
        TextSource::File(path) => {
            let contents = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            api.upload_document_question(question, &file_name(path), contents)
                .await?
        }
    };
    print_json(&response)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.txt".to_string())
}

#[tracing::instrument(skip(api, goals, focus_areas))]
pub async fn learning_path<T: Transport>(
    api: &ApiService<T>,
    goals: &str,
    skill_level: SkillLevel,
    duration: PathDuration,
    focus_areas: Vec<String>,
) -> Result<()> {
    let request = LearningPathRequest {
        goals: goals.to_string(),
        skill_level,
        duration,
        focus_areas,
    };
    let response = api.generate_learning_path(&request).await?;
    print_json(&response)
}

pub async fn learning_path_options<T: Transport>(api: &ApiService<T>) -> Result<()> {
    let options = api.learning_path_options().await?;
    print_json(&options)
}

/// Prints `healthy` or `unhealthy`; the latter is returned as an error.
pub async fn health<T: Transport>(api: &ApiService<T>) -> Result<()> {
    if api.health_check().await {
        println!("healthy");
        Ok(())
    } else {
        println!("unhealthy");
        anyhow::bail!("Backend at {} is not healthy", api.client().config().base_url)
    }
}
