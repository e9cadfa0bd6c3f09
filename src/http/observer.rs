//! Optional hooks around each attempt.

use log::{debug, info, warn};
use std::time::Duration;

use super::transport::{RequestDescriptor, TransportFailure};

/// Pre-call, post-call and on-error callbacks. All hooks default to no-ops.
pub trait RequestObserver: Send + Sync {
    fn on_request(&self, _request: &RequestDescriptor, _attempt: u32) {}

    fn on_response(&self, _request: &RequestDescriptor, _status: u16, _elapsed: Duration) {}

    fn on_error(&self, _request: &RequestDescriptor, _failure: &TransportFailure, _elapsed: Duration) {}
}

/// Logs every attempt through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl RequestObserver for LoggingObserver {
    fn on_request(&self, request: &RequestDescriptor, attempt: u32) {
        debug!(
            "API request: {} {} (attempt {})",
            request.method,
            request.url,
            attempt + 1
        );
    }

    fn on_response(&self, request: &RequestDescriptor, status: u16, elapsed: Duration) {
        info!(
            "API response: {} {} -> {} in {}ms",
            request.method,
            request.url,
            status,
            elapsed.as_millis()
        );
    }

    fn on_error(&self, request: &RequestDescriptor, failure: &TransportFailure, elapsed: Duration) {
        warn!(
            "API error: {} {} -> {} after {}ms",
            request.method,
            request.url,
            failure,
            elapsed.as_millis()
        );
    }
}
