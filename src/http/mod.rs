//! Resilient HTTP request client: timeouts, retry with exponential backoff,
//! and a single normalized error shape.

mod client;
mod config;
mod error;
mod observer;
mod retry;
mod transport;

pub use client::{ApiClient, HEALTH_PATH, MULTIPART_CONTENT_TYPE};
pub use config::{
    ClientConfig, DEFAULT_BASE_URL, DEFAULT_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT,
    RequestOptions,
};
pub use error::{
    NETWORK_ERROR_MESSAGE, NormalizedError, SERVER_ERROR_MESSAGE, UNEXPECTED_ERROR_MESSAGE,
    normalize,
};
pub use observer::{LoggingObserver, RequestObserver};
pub use retry::{FailureClass, RetryPolicy, backoff_delay, classify, with_retry};
pub use transport::{
    FormData, FormPart, Method, NETWORK_ERROR_CODE, RequestBody, RequestDescriptor,
    ReqwestTransport, TIMEOUT_CODE, Transport, TransportFailure, TransportResponse, decode_body,
};

#[cfg(test)]
pub(crate) use transport::MockTransport;
