use log::{error, info, warn};
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use super::chunking::Chunker;
use crate::error::ServiceError;
use crate::models::QaResponse;
use crate::openrouter::{ChatCompletion, ChatMessage, CompletionOptions};

const CHUNKER: Chunker = Chunker::new(4000, 300);
pub const MAX_DOCUMENT_SIZE: usize = 50_000;
const MAX_ANSWER_TOKENS: u32 = 1500;
const ANSWER_TEMPERATURE: f32 = 0.2;
const MIN_RELEVANCE: f64 = 0.3;
const MAX_RELEVANT_SECTIONS: usize = 3;
const MAX_SNIPPET_CHARS: usize = 100;

pub const NO_RELEVANT_INFORMATION: &str =
    "I couldn't find relevant information in the document to answer your question.";

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did",
    "will", "would", "could", "should",
];

const UNCERTAINTY_PHRASES: &[&str] = &[
    "i don't know",
    "not sure",
    "unclear",
    "cannot determine",
    "not enough information",
    "doesn't contain",
    "unable to answer",
];

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w+\b").expect("Invalid word regex"));
static SENTENCE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("Invalid sentence regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));
static CONTROL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("Invalid control character regex")
});

const SCORING_SYSTEM_PROMPT: &str = "You are an expert at evaluating text relevance. Respond only with a decimal number between 0.0 and 1.0.";
const ANSWER_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on provided context. Only use information from the given context to answer questions.";

fn scoring_prompt(question: &str, chunk: &str) -> String {
    format!(
        "Rate how relevant the following text passage is to answering the given question.\n\
         Respond with only a number between 0.0 and 1.0, where:\n\
         - 0.0 = completely irrelevant\n\
         - 0.5 = somewhat relevant\n\
         - 1.0 = highly relevant and directly answers the question\n\n\
         Question: {}\n\n\
         Text passage:\n{}\n\n\
         Relevance score:",
        question, chunk
    )
}

fn answer_prompt(question: &str, context: &str) -> String {
    format!(
        "Based on the following context from a document, please answer the question accurately and concisely.\n\n\
         Context:\n{}\n\n\
         Question: {}\n\n\
         Instructions:\n\
         - Provide a clear, direct answer based only on the information in the context\n\
         - If the context doesn't contain enough information to answer the question, say so\n\
         - Be specific and cite relevant details from the context\n\
         - Keep the answer focused and concise\n\n\
         Answer:",
        context, question
    )
}

pub struct QaService {
    client: Arc<dyn ChatCompletion>,
}

impl QaService {
    pub fn new(client: Arc<dyn ChatCompletion>) -> Self {
        Self { client }
    }

    /// Answers `question` from the most relevant parts of `document_text`.
    #[tracing::instrument(skip(self, question, document_text))]
    pub async fn answer_question(
        &self,
        question: &str,
        document_text: &str,
    ) -> Result<QaResponse, ServiceError> {
        validate_question(question)?;
        validate_document(document_text)?;

        self.answer_validated(question, document_text)
            .await
            .map_err(|e| {
                error!("Q&A failed: {}", e);
                if e.is_provider_error() {
                    e
                } else {
                    ServiceError::DocumentProcessing {
                        message: format!("Q&A processing failed: {}", e),
                        file_type: None,
                    }
                }
            })
    }

    /// Extracts normalized text from an uploaded document.
    pub fn process_document(content: &[u8], file_type: &str) -> Result<String, ServiceError> {
        let file_type = file_type.to_lowercase();
        if !matches!(file_type.as_str(), "text/plain" | ".txt" | "txt") {
            return Err(ServiceError::DocumentProcessing {
                message: format!(
                    "Unsupported file type: {}. Currently only plain text files are supported.",
                    file_type
                ),
                file_type: Some(file_type),
            });
        }
        let text = std::str::from_utf8(content).map_err(|_| ServiceError::DocumentProcessing {
            message: "Unable to decode file content. Please ensure the file is in UTF-8 format."
                .to_string(),
            file_type: Some(file_type.clone()),
        })?;
        Ok(clean_text(text))
    }

    pub async fn health_check(&self) -> bool {
        let document = "FastAPI is a modern, fast web framework for building APIs with Python. It provides automatic API documentation and high performance.";
        match self.answer_question("What is FastAPI?", document).await {
            Ok(response) => {
                !response.answer.is_empty() && response.answer.to_lowercase().contains("fastapi")
            }
            Err(e) => {
                error!("Q&A health check failed: {}", e);
                false
            }
        }
    }

    async fn answer_validated(
        &self,
        question: &str,
        document_text: &str,
    ) -> Result<QaResponse, ServiceError> {
        let sections = self
            .find_relevant_sections(question, document_text)
            .await?;
        if sections.is_empty() {
            return Ok(QaResponse {
                answer: NO_RELEVANT_INFORMATION.to_string(),
                confidence: Some(0.0),
                sources: Some(Vec::new()),
            });
        }

        let context = sections.join("\n\n");
        let messages = vec![
            ChatMessage::system(ANSWER_SYSTEM_PROMPT),
            ChatMessage::user(answer_prompt(question, &context)),
        ];
        let answer = self
            .client
            .chat_completion(
                messages,
                CompletionOptions::new(MAX_ANSWER_TOKENS, ANSWER_TEMPERATURE),
            )
            .await?;
        let confidence = estimate_confidence(&answer, &context);
        info!("Answered question with confidence {:.2}", confidence);

        Ok(QaResponse {
            answer: answer.trim().to_string(),
            confidence: Some(confidence),
            sources: Some(source_snippets(&sections)),
        })
    }

    /// Top-scoring chunks above the relevance cutoff. Scoring errors other
    /// than a failed OpenRouter call abort the search.
    async fn find_relevant_sections(
        &self,
        question: &str,
        document_text: &str,
    ) -> Result<Vec<String>, ServiceError> {
        let mut scored = Vec::new();
        for chunk in CHUNKER.split(document_text) {
            let score = self.score_chunk(question, &chunk).await?;
            if score > MIN_RELEVANCE {
                scored.push((chunk, score));
            }
        }
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(scored
            .into_iter()
            .take(MAX_RELEVANT_SECTIONS)
            .map(|(chunk, _)| chunk)
            .collect())
    }

    /// Model-rated relevance in `[0, 1]`, falling back to keyword overlap
    /// when the reply is not a number or the provider call fails.
    async fn score_chunk(&self, question: &str, chunk: &str) -> Result<f64, ServiceError> {
        let messages = vec![
            ChatMessage::system(SCORING_SYSTEM_PROMPT),
            ChatMessage::user(scoring_prompt(question, chunk)),
        ];
        match self
            .client
            .chat_completion(messages, CompletionOptions::new(10, 0.1))
            .await
        {
            Ok(reply) => match reply.trim().parse::<f64>() {
                Ok(score) if score.is_finite() => Ok(score.clamp(0.0, 1.0)),
                _ => {
                    warn!("Relevance score {:?} is not a number", reply);
                    Ok(keyword_relevance(question, chunk))
                }
            },
            Err(e @ ServiceError::OpenRouter { .. }) => {
                warn!("Relevance scoring failed, using keywords: {}", e);
                Ok(keyword_relevance(question, chunk))
            }
            Err(e) => Err(e),
        }
    }
}

fn validate_question(question: &str) -> Result<(), ServiceError> {
    let length = question.trim().chars().count();
    if length == 0 {
        return Err(ServiceError::validation(
            "Question cannot be empty",
            "question",
            Some(question.to_string()),
        ));
    }
    if length < 5 {
        return Err(ServiceError::validation(
            "Question must be at least 5 characters long",
            "question",
            Some(length.to_string()),
        ));
    }
    if length > 500 {
        return Err(ServiceError::validation(
            "Question must be no more than 500 characters long",
            "question",
            Some(length.to_string()),
        ));
    }
    Ok(())
}

fn validate_document(document_text: &str) -> Result<(), ServiceError> {
    let length = document_text.trim().chars().count();
    if length == 0 {
        return Err(ServiceError::validation(
            "Document text cannot be empty",
            "document_text",
            None,
        ));
    }
    if length < 10 {
        return Err(ServiceError::validation(
            "Document must be at least 10 characters long",
            "document_text",
            Some(length.to_string()),
        ));
    }
    let total = document_text.chars().count();
    if total > MAX_DOCUMENT_SIZE {
        return Err(ServiceError::validation(
            format!(
                "Document is too large. Maximum size is {} characters",
                MAX_DOCUMENT_SIZE
            ),
            "document_text",
            Some(total.to_string()),
        ));
    }
    Ok(())
}

fn content_words(text: &str) -> HashSet<String> {
    WORD_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .collect()
}

/// Share of the question's content words that appear in the chunk.
pub fn keyword_relevance(question: &str, chunk: &str) -> f64 {
    let question_words = content_words(question);
    if question_words.is_empty() {
        return 0.0;
    }
    let chunk_words = content_words(chunk);
    let overlap = question_words.intersection(&chunk_words).count();
    (overlap as f64 / question_words.len() as f64).min(1.0)
}

/// Heuristic confidence in an answer given the context it was drawn from.
pub fn estimate_confidence(answer: &str, context: &str) -> f64 {
    let answer_lower = answer.to_lowercase();
    let mut confidence: f64 = if UNCERTAINTY_PHRASES
        .iter()
        .any(|phrase| answer_lower.contains(phrase))
    {
        0.2
    } else {
        0.5
    };

    let trimmed_length = answer.trim().chars().count();
    if trimmed_length < 20 {
        confidence *= 0.7;
    }
    if trimmed_length > 500 {
        confidence *= 0.6;
    }

    let context_lower = context.to_lowercase();
    let words: Vec<&str> = answer_lower.split_whitespace().collect();
    if words.len() > 10 && words.iter().take(10).any(|w| context_lower.contains(w)) {
        confidence = (confidence + 0.2).min(1.0);
    }
    confidence.clamp(0.0, 1.0)
}

/// First sentence of each section, cut to 100 characters.
pub fn source_snippets(sections: &[String]) -> Vec<String> {
    sections
        .iter()
        .take(MAX_RELEVANT_SECTIONS)
        .map(|section| {
            let first = SENTENCE_SPLIT_RE
                .split(section)
                .next()
                .map(str::trim)
                .unwrap_or_default();
            if !first.is_empty() {
                truncate(first)
            } else if section.chars().count() > MAX_SNIPPET_CHARS {
                truncate(section)
            } else {
                section.trim().to_string()
            }
        })
        .collect()
}

fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_SNIPPET_CHARS {
        let head: String = text.chars().take(MAX_SNIPPET_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Collapses whitespace runs and drops control characters.
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(text, " ");
    CONTROL_RE.replace_all(&collapsed, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openrouter::{MockChatCompletion, Role};

    const DOCUMENT: &str = "FastAPI is a modern web framework for building APIs with Python. It is fast.";

    fn is_scoring(messages: &[ChatMessage]) -> bool {
        messages[0].role == Role::System && messages[0].content == SCORING_SYSTEM_PROMPT
    }

    #[tokio::test]
    async fn test_answers_from_relevant_section() {
        let mut client = MockChatCompletion::new();
        client
            .expect_chat_completion()
            .withf(|messages, options| is_scoring(messages) && options.max_tokens == Some(10))
            .times(1)
            .returning(|_, _| Ok("0.9".to_string()));
        client
            .expect_chat_completion()
            .withf(|messages, options| {
                !is_scoring(messages)
                    && messages[1].content.contains(DOCUMENT)
                    && options.max_tokens == Some(1500)
                    && options.temperature == 0.2
            })
            .times(1)
            .returning(|_, _| {
                Ok("FastAPI is a modern web framework for building APIs with Python and is fast."
                    .to_string())
            });

        let service = QaService::new(Arc::new(client));
        let response = service
            .answer_question("What is FastAPI?", DOCUMENT)
            .await
            .unwrap();

        assert!(response.answer.starts_with("FastAPI"));
        assert!((response.confidence.unwrap() - 0.7).abs() < 1e-9);
        assert_eq!(
            response.sources,
            Some(vec![
                "FastAPI is a modern web framework for building APIs with Python".to_string()
            ])
        );
    }

    #[tokio::test]
    async fn test_irrelevant_document_short_circuits() {
        let mut client = MockChatCompletion::new();
        client
            .expect_chat_completion()
            .times(1)
            .returning(|_, _| Ok("0.1".to_string()));

        let service = QaService::new(Arc::new(client));
        let response = service
            .answer_question("Who won the match?", DOCUMENT)
            .await
            .unwrap();

        assert_eq!(response.answer, NO_RELEVANT_INFORMATION);
        assert_eq!(response.confidence, Some(0.0));
        assert_eq!(response.sources, Some(vec![]));
    }

    #[tokio::test]
    async fn test_unparseable_score_uses_keywords() {
        let mut client = MockChatCompletion::new();
        client
            .expect_chat_completion()
            .withf(|messages, _| is_scoring(messages))
            .times(1)
            .returning(|_, _| Ok("very relevant".to_string()));
        client
            .expect_chat_completion()
            .withf(|messages, _| !is_scoring(messages))
            .times(1)
            .returning(|_, _| Ok("It is a Python web framework.".to_string()));

        let service = QaService::new(Arc::new(client));
        let response = service
            .answer_question("What is FastAPI built with?", DOCUMENT)
            .await
            .unwrap();
        assert_eq!(response.answer, "It is a Python web framework.");
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let mut client = MockChatCompletion::new();
        client.expect_chat_completion().times(0);
        let service = QaService::new(Arc::new(client));

        let err = service.answer_question("   ", DOCUMENT).await.unwrap_err();
        assert_eq!(err.to_string(), "Question cannot be empty");

        let err = service.answer_question("Why?", DOCUMENT).await.unwrap_err();
        assert_eq!(err.to_string(), "Question must be at least 5 characters long");

        let err = service
            .answer_question("What is this?", "  tiny  ")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Document must be at least 10 characters long");

        let err = service
            .answer_question("What is this?", &"x".repeat(MAX_DOCUMENT_SIZE + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_answer_failure_passes_provider_error() {
        let mut client = MockChatCompletion::new();
        client
            .expect_chat_completion()
            .withf(|messages, _| is_scoring(messages))
            .returning(|_, _| Ok("1.0".to_string()));
        client
            .expect_chat_completion()
            .withf(|messages, _| !is_scoring(messages))
            .returning(|_, _| {
                Err(ServiceError::Authentication {
                    message: "Invalid API key or unauthorized access".into(),
                })
            });

        let service = QaService::new(Arc::new(client));
        let err = service
            .answer_question("What is FastAPI?", DOCUMENT)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Authentication { .. }));
    }

    #[tokio::test]
    async fn test_missing_key_while_scoring_is_not_hidden() {
        let mut client = MockChatCompletion::new();
        client
            .expect_chat_completion()
            .withf(|messages, _| is_scoring(messages))
            .times(1)
            .returning(|_, _| {
                Err(ServiceError::Configuration {
                    message: "OpenRouter API key is required".into(),
                    config_key: Some("OPENAI_API_KEY".into()),
                })
            });

        let service = QaService::new(Arc::new(client));
        let err = service
            .answer_question("What is FastAPI?", DOCUMENT)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_open_router_scoring_error_falls_back_to_keywords() {
        let mut client = MockChatCompletion::new();
        client
            .expect_chat_completion()
            .withf(|messages, _| is_scoring(messages))
            .times(1)
            .returning(|_, _| Err(ServiceError::open_router("bad gateway")));
        client
            .expect_chat_completion()
            .withf(|messages, _| !is_scoring(messages))
            .times(1)
            .returning(|_, _| Ok("A modern web framework.".to_string()));

        let service = QaService::new(Arc::new(client));
        let response = service
            .answer_question("What is FastAPI?", DOCUMENT)
            .await
            .unwrap();
        assert_eq!(response.answer, "A modern web framework.");
    }

    #[test]
    fn test_keyword_relevance_ignores_stop_words() {
        assert_eq!(keyword_relevance("the and of", "anything"), 0.0);
        assert_eq!(
            keyword_relevance("What is FastAPI?", "fastapi is great"),
            0.5
        );
        assert_eq!(keyword_relevance("FastAPI Python", DOCUMENT), 1.0);
    }

    #[test]
    fn test_confidence_heuristics() {
        assert!((estimate_confidence("Yes.", "ctx") - 0.35).abs() < 1e-9);
        assert!((estimate_confidence("I don't know the answer to this one.", "ctx") - 0.2).abs() < 1e-9);
        let grounded = "python is used here to build a service that is fast and reliable overall";
        assert!((estimate_confidence(grounded, "python") - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_source_snippets_truncate() {
        let long_sentence = format!("{} end.", "word ".repeat(40));
        let snippets = source_snippets(&[long_sentence, "...".to_string()]);
        assert_eq!(snippets[0].chars().count(), 100);
        assert!(snippets[0].ends_with("..."));
        assert_eq!(snippets[1], "...");
    }

    #[test]
    fn test_process_document() {
        let text = QaService::process_document(b"Line one\r\n\tLine\x07 two  ", "text/plain").unwrap();
        assert_eq!(text, "Line one Line two");

        let err = QaService::process_document(b"%PDF", "application/pdf").unwrap_err();
        assert!(matches!(err, ServiceError::DocumentProcessing { .. }));

        let err = QaService::process_document(&[0xff, 0xfe, 0x00], "txt").unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }
}
