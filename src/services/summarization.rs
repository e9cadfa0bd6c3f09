use log::{debug, error, warn};
use std::sync::Arc;

use super::chunking::Chunker;
use crate::error::ServiceError;
use crate::models::{SummarizationResponse, SummaryStyle};
use crate::openrouter::{ChatCompletion, ChatMessage, CompletionOptions};

const CHUNKER: Chunker = Chunker::new(3000, 200);
const MAX_TOKENS_PER_REQUEST: u32 = 1000;
const TEMPERATURE: f32 = 0.3;
const MIN_CHUNK_SUMMARY_WORDS: u32 = 50;

const SYSTEM_PROMPT: &str = "You are an expert text summarizer. Provide clear, accurate summaries that capture the key points of the given text.";

fn style_instruction(style: SummaryStyle) -> &'static str {
    match style {
        SummaryStyle::Concise => {
            "Create a concise summary that captures the main points in clear, direct language."
        }
        SummaryStyle::Detailed => {
            "Create a detailed summary that includes important context and supporting details."
        }
        SummaryStyle::BulletPoints => {
            "Create a summary using bullet points to organize the key information clearly."
        }
    }
}

fn build_prompt(text: &str, max_length: u32, style: SummaryStyle) -> String {
    format!(
        "Please summarize the following text. {}\n\n\
         Requirements:\n\
         - Maximum length: approximately {} words\n\
         - Focus on the most important information\n\
         - Maintain accuracy and clarity\n\
         - Use proper grammar and structure\n\n\
         Text to summarize:\n{}\n\n\
         Summary:",
        style_instruction(style),
        max_length,
        text
    )
}

pub struct SummarizationService {
    client: Arc<dyn ChatCompletion>,
}

impl SummarizationService {
    pub fn new(client: Arc<dyn ChatCompletion>) -> Self {
        Self { client }
    }

    /// Summarizes `text` in at most about `max_length` words, chunking
    /// texts too long for one request.
    #[tracing::instrument(skip(self, text))]
    pub async fn summarize(
        &self,
        text: &str,
        max_length: u32,
        style: SummaryStyle,
    ) -> Result<SummarizationResponse, ServiceError> {
        let trimmed_length = text.trim().chars().count();
        if trimmed_length < 10 {
            return Err(ServiceError::validation(
                "Text must be at least 10 characters long",
                "text",
                Some(trimmed_length.to_string()),
            ));
        }
        if !(50..=500).contains(&max_length) {
            return Err(ServiceError::validation(
                "max_length must be between 50 and 500 words",
                "max_length",
                Some(max_length.to_string()),
            ));
        }

        let original_length = text.chars().count();
        let result = if original_length <= CHUNKER.chunk_size {
            self.summarize_chunk(text, max_length, style).await
        } else {
            self.summarize_chunked(text, max_length, style).await
        };

        let summary = result.map_err(|e| {
            error!("Summarization of {} characters failed: {}", original_length, e);
            if e.is_provider_error() {
                e
            } else {
                ServiceError::TextProcessing {
                    message: format!("Summarization failed: {}", e),
                    text_length: Some(original_length),
                }
            }
        })?;

        let summary_length = summary.chars().count();
        Ok(SummarizationResponse {
            summary,
            original_length,
            summary_length,
            compression_ratio: summary_length as f64 / original_length as f64,
        })
    }

    pub async fn health_check(&self) -> bool {
        let text = "This is a test text for health check. It contains enough content to be summarized properly.";
        match self.summarize(text, 50, SummaryStyle::Concise).await {
            Ok(response) => !response.summary.is_empty(),
            Err(e) => {
                error!("Summarization health check failed: {}", e);
                false
            }
        }
    }

    async fn summarize_chunk(
        &self,
        text: &str,
        max_length: u32,
        style: SummaryStyle,
    ) -> Result<String, ServiceError> {
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_prompt(text, max_length, style)),
        ];
        let max_tokens = (max_length * 2).min(MAX_TOKENS_PER_REQUEST);
        let summary = self
            .client
            .chat_completion(messages, CompletionOptions::new(max_tokens, TEMPERATURE))
            .await?;
        Ok(summary.trim().to_string())
    }

    async fn summarize_chunked(
        &self,
        text: &str,
        max_length: u32,
        style: SummaryStyle,
    ) -> Result<String, ServiceError> {
        let chunks = CHUNKER.split(text);
        let chunk_max_length = (max_length / chunks.len().max(1) as u32).max(MIN_CHUNK_SUMMARY_WORDS);

        let mut summaries = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            match self
                .summarize_chunk(chunk, chunk_max_length, SummaryStyle::Concise)
                .await
            {
                Ok(summary) => {
                    debug!("Summarized chunk {}/{}", i + 1, chunks.len());
                    summaries.push(summary);
                }
                Err(e) => warn!("Failed to summarize chunk {}: {}", i + 1, e),
            }
        }

        if summaries.is_empty() {
            return Err(ServiceError::Internal {
                message: "Failed to summarize any chunks of the text".to_string(),
            });
        }

        self.summarize_chunk(&summaries.join(" "), max_length, style)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openrouter::MockChatCompletion;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn long_text() -> String {
        "Rust guarantees memory safety without a garbage collector. ".repeat(120)
    }

    #[tokio::test]
    async fn test_short_text_is_summarized_in_one_call() {
        let mut client = MockChatCompletion::new();
        client
            .expect_chat_completion()
            .withf(|messages, options| {
                messages.len() == 2
                    && messages[1].content.contains("approximately 150 words")
                    && messages[1].content.contains("bullet points")
                    && options.max_tokens == Some(300)
                    && options.temperature == 0.3
            })
            .times(1)
            .returning(|_, _| Ok("  A summary.  ".to_string()));

        let service = SummarizationService::new(Arc::new(client));
        let text = "This text is long enough to be summarized by the model.";
        let response = service
            .summarize(text, 150, SummaryStyle::BulletPoints)
            .await
            .unwrap();

        assert_eq!(response.summary, "A summary.");
        assert_eq!(response.original_length, text.chars().count());
        assert_eq!(response.summary_length, 10);
        assert!((response.compression_ratio - 10.0 / text.len() as f64).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_max_tokens_is_capped() {
        let mut client = MockChatCompletion::new();
        client
            .expect_chat_completion()
            .withf(|_, options| options.max_tokens == Some(1000))
            .times(1)
            .returning(|_, _| Ok("Summary".to_string()));

        let service = SummarizationService::new(Arc::new(client));
        service
            .summarize("Enough text to summarize.", 500, SummaryStyle::Detailed)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_input_makes_no_calls() {
        let mut client = MockChatCompletion::new();
        client.expect_chat_completion().times(0);
        let service = SummarizationService::new(Arc::new(client));

        let err = service
            .summarize("   short    ", 150, SummaryStyle::Concise)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref field, .. } if field.as_deref() == Some("text")));

        let err = service
            .summarize("Enough text to summarize.", 20, SummaryStyle::Concise)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ServiceError::Validation { ref field, .. } if field.as_deref() == Some("max_length"))
        );
    }

    #[tokio::test]
    async fn test_long_text_is_chunked_then_combined() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut client = MockChatCompletion::new();
        client.expect_chat_completion().returning(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("Partial summary.".to_string())
        });

        let text = long_text();
        let chunk_count = CHUNKER.split(&text).len();
        assert!(chunk_count > 1);

        let service = SummarizationService::new(Arc::new(client));
        let response = service
            .summarize(&text, 150, SummaryStyle::Concise)
            .await
            .unwrap();

        assert_eq!(response.summary, "Partial summary.");
        assert_eq!(calls.load(Ordering::SeqCst), chunk_count + 1);
    }

    #[tokio::test]
    async fn test_failed_chunk_is_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut client = MockChatCompletion::new();
        client.expect_chat_completion().returning(move |_, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ServiceError::open_router("transient"))
            } else {
                Ok("Partial summary.".to_string())
            }
        });

        let service = SummarizationService::new(Arc::new(client));
        let response = service
            .summarize(&long_text(), 150, SummaryStyle::Detailed)
            .await
            .unwrap();
        assert_eq!(response.summary, "Partial summary.");
    }

    #[tokio::test]
    async fn test_all_chunks_failing_is_text_processing_error() {
        let mut client = MockChatCompletion::new();
        client
            .expect_chat_completion()
            .returning(|_, _| Err(ServiceError::open_router("down")));

        let service = SummarizationService::new(Arc::new(client));
        let err = service
            .summarize(&long_text(), 150, SummaryStyle::Concise)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::TextProcessing { text_length: Some(_), .. }));
    }

    #[tokio::test]
    async fn test_provider_error_passes_through() {
        let mut client = MockChatCompletion::new();
        client.expect_chat_completion().times(1).returning(|_, _| {
            Err(ServiceError::RateLimit {
                message: "Rate limit exceeded after all retries".into(),
                retry_after: Some(30),
            })
        });

        let service = SummarizationService::new(Arc::new(client));
        let err = service
            .summarize("Enough text to summarize.", 150, SummaryStyle::Concise)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RateLimit { retry_after: Some(30), .. }));
    }

    #[tokio::test]
    async fn test_health_check() {
        let mut client = MockChatCompletion::new();
        client
            .expect_chat_completion()
            .returning(|_, _| Ok("Healthy summary".to_string()));
        assert!(SummarizationService::new(Arc::new(client)).health_check().await);

        let mut client = MockChatCompletion::new();
        client.expect_chat_completion().returning(|_, _| {
            Err(ServiceError::Configuration {
                message: "missing key".into(),
                config_key: None,
            })
        });
        assert!(!SummarizationService::new(Arc::new(client)).health_check().await);
    }
}
