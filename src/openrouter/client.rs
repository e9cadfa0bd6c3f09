use async_trait::async_trait;
use log::{debug, warn};
use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;

use super::{ChatCompletion, ChatMessage, CompletionOptions};
use crate::error::ServiceError;
use crate::http::backoff_delay;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Sent as `HTTP-Referer`; OpenRouter attributes traffic by it.
pub const APP_REFERER: &str = "http://localhost:8000";
pub const APP_TITLE: &str = "AI Microservices";

const COMPLETIONS_PATH: &str = "/chat/completions";

pub struct OpenRouterClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl OpenRouterClient {
    #[tracing::instrument(skip(api_key))]
    pub fn new(
        api_key: Option<String>,
        base_url: &str,
        model: &str,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ServiceError::Configuration {
                message: format!("Failed to build HTTP client: {}", e),
                config_key: None,
            })?;

        Ok(Self {
            client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Sends a tiny completion to check that the key and provider work.
    pub async fn health_check(&self) -> bool {
        self.chat_completion(
            vec![ChatMessage::user("Hello")],
            CompletionOptions {
                max_tokens: Some(5),
                ..CompletionOptions::default()
            },
        )
        .await
        .is_ok()
    }

    async fn post_with_retry(&self, api_key: &str, payload: &Value) -> Result<String, ServiceError> {
        let url = format!("{}{}", self.base_url, COMPLETIONS_PATH);
        let mut attempt = 0;

        loop {
            let can_retry = attempt < self.max_retries;
            let outcome = self
                .client
                .post(&url)
                .bearer_auth(api_key)
                .header("HTTP-Referer", APP_REFERER)
                .header("X-Title", APP_TITLE)
                .json(payload)
                .send()
                .await;

            let response = match outcome {
                Ok(response) => response,
                Err(e) => {
                    let kind = if e.is_timeout() {
                        "Request timeout"
                    } else {
                        "Request error"
                    };
                    if can_retry {
                        let delay = backoff_delay(self.retry_delay, attempt);
                        warn!("{}: {}. Retrying in {:?}...", kind, e, delay);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(if e.is_timeout() {
                        ServiceError::open_router("Request timeout after all retries")
                    } else {
                        ServiceError::open_router(format!("Request failed after all retries: {}", e))
                    });
                }
            };

            let status = response.status();
            if status == StatusCode::OK {
                let data: Value = response.json().await.map_err(|e| {
                    ServiceError::open_router(format!("Invalid response format: {}", e))
                })?;
                return extract_content(&data);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if can_retry {
                    let delay = rate_limit_delay(self.retry_delay, attempt, response.headers());
                    warn!("Rate limited. Retrying in {:?}...", delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok());
                return Err(ServiceError::RateLimit {
                    message: "Rate limit exceeded after all retries".to_string(),
                    retry_after,
                });
            }

            if status == StatusCode::UNAUTHORIZED {
                return Err(ServiceError::Authentication {
                    message: "Invalid API key or unauthorized access".to_string(),
                });
            }

            if status.is_server_error() {
                if can_retry {
                    let delay = backoff_delay(self.retry_delay, attempt);
                    warn!("Server error {}. Retrying in {:?}...", status.as_u16(), delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                return Err(ServiceError::ServiceUnavailable {
                    message: format!(
                        "OpenRouter service unavailable after all retries: {}",
                        status.as_u16()
                    ),
                    service_name: Some("OpenRouter".to_string()),
                });
            }

            let bytes = response.bytes().await.unwrap_or_default();
            let error_data: Value = serde_json::from_slice(&bytes).unwrap_or_else(|_| json!({}));
            let error_message = error_data
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(ServiceError::OpenRouter {
                message: format!("API request failed: {}", error_message),
                status_code: Some(status.as_u16()),
                response_data: Some(error_data),
            });
        }
    }
}

#[async_trait]
impl ChatCompletion for OpenRouterClient {
    #[tracing::instrument(skip(self, messages))]
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<String, ServiceError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ServiceError::Configuration {
                message: "OpenRouter API key is required. Set OPENAI_API_KEY environment variable."
                    .to_string(),
                config_key: Some("OPENAI_API_KEY".to_string()),
            });
        };

        let mut payload = json!({
            "model": self.model,
            "messages": messages,
            "temperature": options.temperature,
        });
        if let Some(max_tokens) = options.max_tokens {
            payload["max_tokens"] = json!(max_tokens);
        }

        debug!(
            "Requesting completion from {} ({} messages)",
            self.model,
            messages.len()
        );
        self.post_with_retry(api_key, &payload).await
    }
}

/// Wait before retrying a 429: the `Retry-After` seconds when present,
/// otherwise exponential backoff plus 10-30% jitter.
pub fn rate_limit_delay(base: Duration, attempt: u32, headers: &HeaderMap) -> Duration {
    let retry_after = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0);
    if let Some(secs) = retry_after {
        return Duration::from_secs_f64(secs);
    }

    let delay = backoff_delay(base, attempt);
    let jitter = rand::thread_rng().gen_range(0.1..=0.3);
    delay + delay.mul_f64(jitter)
}

/// Pulls `choices[0].message.content` out of a completion response.
pub fn extract_content(data: &Value) -> Result<String, ServiceError> {
    let choice = data
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| ServiceError::OpenRouter {
            message: "No choices in API response".to_string(),
            status_code: None,
            response_data: Some(data.clone()),
        })?;

    let content = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim();
    if content.is_empty() {
        return Err(ServiceError::open_router("Empty content in API response"));
    }
    Ok(content.to_string())
}
