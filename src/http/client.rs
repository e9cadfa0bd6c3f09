//! HTTP client with built-in retry logic and error normalization.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::config::{ClientConfig, RequestOptions, merge_header};
use super::error::{NormalizedError, normalize};
use super::observer::RequestObserver;
use super::retry::{RetryPolicy, with_retry};
use super::transport::{
    FormData, Method, RequestBody, RequestDescriptor, ReqwestTransport, TIMEOUT_CODE, Transport,
    TransportFailure,
};

/// Well-known liveness path probed by [`ApiClient::health_check`].
pub const HEALTH_PATH: &str = "/health";

/// Content type this client forces on uploads.
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data";

/// Resilient client for a single backend base URL.
///
/// Calls share no mutable state: each one builds a fresh
/// [`RequestDescriptor`] and runs its own retry loop, so any number of calls
/// may be in flight concurrently.
pub struct ApiClient<T = ReqwestTransport> {
    transport: T,
    config: ClientConfig,
    observers: Vec<Arc<dyn RequestObserver>>,
}

impl ApiClient<ReqwestTransport> {
    /// Creates a client using the default reqwest-backed transport.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(ReqwestTransport::default(), config)
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            observers: Vec::new(),
        }
    }

    /// Registers an observer notified around every attempt.
    pub fn with_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<R, NormalizedError> {
        self.execute(Method::Get, path, None, options).await
    }

    #[tracing::instrument(skip(self, body, options))]
    pub async fn post<B, R>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<R, NormalizedError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = json_body(body)?;
        self.execute(Method::Post, path, Some(body), options).await
    }

    #[tracing::instrument(skip(self, body, options))]
    pub async fn put<B, R>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<R, NormalizedError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = json_body(body)?;
        self.execute(Method::Put, path, Some(body), options).await
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn delete<R: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<R, NormalizedError> {
        self.execute(Method::Delete, path, None, options).await
    }

    /// Posts a multipart form. The content type is always
    /// `multipart/form-data`; other caller headers are kept.
    #[tracing::instrument(skip(self, form, options))]
    pub async fn upload<R: DeserializeOwned>(
        &self,
        path: &str,
        form: FormData,
        options: RequestOptions,
    ) -> Result<R, NormalizedError> {
        self.execute(Method::Post, path, Some(RequestBody::Multipart(form)), options)
            .await
    }

    /// Best-effort liveness probe: `true` only when `GET /health` succeeds.
    #[tracing::instrument(skip(self))]
    pub async fn health_check(&self) -> bool {
        self.get::<Value>(HEALTH_PATH, RequestOptions::default())
            .await
            .is_ok()
    }

    /// Builds the descriptor for one logical call.
    pub fn describe(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: &RequestOptions,
    ) -> RequestDescriptor {
        let mut headers = self.config.headers.clone();
        for (name, value) in &options.headers {
            merge_header(&mut headers, name, value.clone());
        }
        if matches!(body, Some(RequestBody::Multipart(_))) {
            merge_header(&mut headers, "Content-Type", MULTIPART_CONTENT_TYPE.to_string());
        }

        RequestDescriptor {
            method,
            url: self.config.url_for(path),
            body,
            headers,
        }
    }

    async fn execute<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Result<R, NormalizedError> {
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let request = self.describe(method, path, body, &options);
        let policy = RetryPolicy {
            retries: self.config.retries,
            base_delay: self.config.retry_delay,
        };
        let operation_name = format!("{} {}", method, path);

        with_retry(&operation_name, policy, |attempt| {
            let request = &request;
            async move { self.attempt(request, attempt, timeout).await }
        })
        .await
        .map_err(|failure| normalize(&failure))
    }

    async fn attempt<R: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
        attempt: u32,
        timeout: Duration,
    ) -> Result<R, TransportFailure> {
        for observer in &self.observers {
            observer.on_request(request, attempt);
        }
        let started = Instant::now();

        let outcome = match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportFailure::Timeout {
                code: Some(TIMEOUT_CODE.to_string()),
            }),
        };

        let response = outcome.and_then(|response| {
            if response.is_success() {
                Ok(response)
            } else {
                Err(TransportFailure::HttpStatus {
                    status: response.status,
                    body: response.body,
                    code: None,
                })
            }
        });

        match response {
            Ok(response) => {
                for observer in &self.observers {
                    observer.on_response(request, response.status, started.elapsed());
                }
                serde_json::from_value(response.body).map_err(|e| TransportFailure::Other {
                    message: format!("Failed to parse response: {}", e),
                })
            }
            Err(failure) => {
                for observer in &self.observers {
                    observer.on_error(request, &failure, started.elapsed());
                }
                Err(failure)
            }
        }
    }
}

fn json_body<B: Serialize + ?Sized>(body: &B) -> Result<RequestBody, NormalizedError> {
    serde_json::to_value(body)
        .map(RequestBody::Json)
        .map_err(|e| NormalizedError::new(format!("Failed to serialize request: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::error::NETWORK_ERROR_MESSAGE;
    use crate::http::transport::{MockTransport, NETWORK_ERROR_CODE, TransportResponse};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    fn config() -> ClientConfig {
        ClientConfig::new("http://backend.test")
    }

    fn ok(body: Value) -> Result<TransportResponse, TransportFailure> {
        Ok(TransportResponse { status: 200, body })
    }

    fn network_error() -> Result<TransportResponse, TransportFailure> {
        Err(TransportFailure::NoResponse {
            code: Some(NETWORK_ERROR_CODE.to_string()),
        })
    }

    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Summary {
        summary: String,
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_success_calls_transport_once() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.method == Method::Get && req.url == "http://backend.test/api/info")
            .times(1)
            .returning(|_| ok(json!({"name": "AI Microservices API"})));

        let client = ApiClient::with_transport(transport, config());
        let start = Instant::now();
        let body: Value = client
            .get("/api/info", RequestOptions::default())
            .await
            .unwrap();

        assert_eq!(body["name"], "AI Microservices API");
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_recovers_after_two_network_errors() {
        let mut transport = MockTransport::new();
        let mut calls = 0;
        transport
            .expect_send()
            .withf(|req| {
                req.url == "http://backend.test/api/summarize"
                    && req.body == Some(RequestBody::Json(json!({"text": "long text"})))
            })
            .times(3)
            .returning(move |_| {
                calls += 1;
                if calls < 3 {
                    network_error()
                } else {
                    ok(json!({"summary": "short"}))
                }
            });

        let client = ApiClient::with_transport(transport, config());
        let start = Instant::now();
        let result: Summary = client
            .post(
                "/api/summarize",
                &json!({"text": "long text"}),
                RequestOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.summary, "short");
        assert!(start.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_exhaust_four_attempts() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(4).returning(|_| {
            Ok(TransportResponse {
                status: 503,
                body: json!({"message": "Service temporarily unavailable"}),
            })
        });

        let client = ApiClient::with_transport(transport, config());
        let start = Instant::now();
        let err = client
            .get::<Value>("/api/learning-path/options", RequestOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.message, "Service temporarily unavailable");
        assert_eq!(err.status_code, Some(503));
        assert!(start.elapsed() >= Duration::from_millis(7000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_is_not_retried() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(TransportResponse {
                status: 400,
                body: json!({"message": "Bad request"}),
            })
        });

        let client = ApiClient::with_transport(transport, config());
        let start = Instant::now();
        let err = client
            .post::<_, Value>(
                "/api/qa",
                &json!({"question": "?"}),
                RequestOptions::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.message, "Bad request");
        assert_eq!(err.status_code, Some(400));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_is_normalized() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(4).returning(|_| network_error());

        let client = ApiClient::with_transport(transport, config());
        let err = client
            .delete::<Value>("/api/thing", RequestOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.message, NETWORK_ERROR_MESSAGE);
        assert_eq!(err.status_code, None);
        assert_eq!(err.error_code.as_deref(), Some(NETWORK_ERROR_CODE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_undecodable_body_is_not_retried() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| ok(json!({"unexpected": true})));

        let client = ApiClient::with_transport(transport, config());
        let err = client
            .get::<Summary>("/api/summarize", RequestOptions::default())
            .await
            .unwrap_err();

        assert!(err.message.starts_with("Failed to parse response"));
        assert_eq!(err.status_code, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_and_custom_retry_config() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.method == Method::Put)
            .times(2)
            .returning(|_| Err(TransportFailure::Timeout { code: None }));

        let client = ApiClient::with_transport(
            transport,
            config()
                .with_retries(1)
                .with_retry_delay(Duration::from_millis(10)),
        );
        let start = Instant::now();
        let err = client
            .put::<_, Value>("/api/thing", &json!({}), RequestOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.message, NETWORK_ERROR_MESSAGE);
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_forces_multipart_and_keeps_custom_headers() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| {
                req.header("Content-Type") == Some(MULTIPART_CONTENT_TYPE)
                    && req.header("X-Custom") == Some("value")
                    && req
                        .headers
                        .iter()
                        .filter(|(k, _)| k.eq_ignore_ascii_case("content-type"))
                        .count()
                        == 1
                    && matches!(req.body, Some(RequestBody::Multipart(_)))
            })
            .times(1)
            .returning(|_| ok(json!({"answer": "yes"})));

        let client = ApiClient::with_transport(transport, config());
        let form = FormData::new()
            .text("question", "Is it?")
            .file("file", "doc.txt", "text/plain", b"it is".to_vec());
        let options = RequestOptions::default()
            .with_header("X-Custom", "value")
            .with_header("content-type", "application/xml");

        let body: Value = client.upload("/api/qa", form, options).await.unwrap();
        assert_eq!(body["answer"], "yes");
    }

    #[test]
    fn test_per_call_headers_override_defaults() {
        let client = ApiClient::with_transport(MockTransport::new(), config());
        let options = RequestOptions::default().with_header("content-type", "text/plain");
        let req = client.describe(Method::Get, "/x", None, &options);

        assert_eq!(req.header("Content-Type"), Some("text/plain"));
        assert_eq!(req.headers.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_true_on_success() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.url == "http://backend.test/health")
            .times(1)
            .returning(|_| ok(json!({"status": "healthy"})));

        let client = ApiClient::with_transport(transport, config());
        assert!(client.health_check().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_false_on_client_error() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(TransportResponse {
                status: 404,
                body: Value::Null,
            })
        });

        let client = ApiClient::with_transport(transport, config());
        assert!(!client.health_check().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_false_on_network_failure() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(4).returning(|_| network_error());

        let client = ApiClient::with_transport(transport, config());
        assert!(!client.health_check().await);
    }

    struct StalledTransport;

    #[async_trait]
    impl Transport for StalledTransport {
        async fn send(
            &self,
            _request: &RequestDescriptor,
        ) -> Result<TransportResponse, TransportFailure> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            ok(Value::Null)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_attempt_gets_a_fresh_timeout() {
        let client = ApiClient::with_transport(
            StalledTransport,
            config()
                .with_retries(2)
                .with_retry_delay(Duration::from_millis(100)),
        );
        let start = Instant::now();
        let err = client
            .get::<Value>(
                "/slow",
                RequestOptions::default().with_timeout(Duration::from_secs(5)),
            )
            .await
            .unwrap_err();

        assert_eq!(err.error_code.as_deref(), Some(TIMEOUT_CODE));
        // three 5s attempts plus 100ms + 200ms of backoff
        assert!(start.elapsed() >= Duration::from_millis(15_300));
        assert!(start.elapsed() < Duration::from_secs(3600));
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl RequestObserver for RecordingObserver {
        fn on_request(&self, request: &RequestDescriptor, attempt: u32) {
            self.events
                .lock()
                .unwrap()
                .push(format!("request {} #{}", request.method, attempt));
        }

        fn on_response(&self, _request: &RequestDescriptor, status: u16, _elapsed: Duration) {
            self.events.lock().unwrap().push(format!("response {}", status));
        }

        fn on_error(&self, _request: &RequestDescriptor, failure: &TransportFailure, _elapsed: Duration) {
            self.events.lock().unwrap().push(format!("error {}", failure));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_observers_see_every_attempt() {
        let mut transport = MockTransport::new();
        let mut calls = 0;
        transport.expect_send().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(TransportResponse {
                    status: 500,
                    body: Value::Null,
                })
            } else {
                ok(json!({}))
            }
        });

        let observer = Arc::new(RecordingObserver::default());
        let client = ApiClient::with_transport(transport, config()).with_observer(observer.clone());
        let _: Value = client.get("/x", RequestOptions::default()).await.unwrap();

        let events = observer.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                "request GET #0".to_string(),
                "error HTTP 500".to_string(),
                "request GET #1".to_string(),
                "response 200".to_string(),
            ]
        );
    }
}
