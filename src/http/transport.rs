//! Transport boundary: one HTTP exchange described as plain data.
//!
//! The retry loop never sees a library-specific error type. Every transport
//! reports either a received response (any status) or a tagged
//! [`TransportFailure`].

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, multipart};
use serde_json::Value;
use std::fmt;

/// Error code reported when no response was received.
pub const NETWORK_ERROR_CODE: &str = "NETWORK_ERROR";

/// Error code reported when an attempt exceeded its timeout.
pub const TIMEOUT_CODE: &str = "TIMEOUT";

/// HTTP verbs supported by the request client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// A single part of a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

/// Owned multipart payload.
///
/// Unlike `reqwest::multipart::Form` this can be cloned, so the same payload
/// is re-sent on every attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    parts: Vec<FormPart>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        });
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }
}

/// Payload of an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Multipart(FormData),
}

/// Immutable description of one logical request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Absolute URL (base URL joined with the caller's relative path).
    pub url: String,
    pub body: Option<RequestBody>,
    pub headers: Vec<(String, String)>,
}

impl RequestDescriptor {
    /// Returns the value of a header, matching the name case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response that reached the client, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    /// Decoded JSON body; `Value::Null` for an empty body, `Value::String`
    /// for a body that is not JSON.
    pub body: Value,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Tagged failure of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportFailure {
    /// The request was sent but nothing came back (refused, DNS, offline, aborted).
    NoResponse { code: Option<String> },
    /// The attempt exceeded its timeout.
    Timeout { code: Option<String> },
    /// A response was received with a non-2xx status.
    HttpStatus {
        status: u16,
        body: Value,
        code: Option<String>,
    },
    /// Anything that is not an HTTP-layer failure.
    Other { message: String },
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFailure::NoResponse { code } => {
                write!(f, "no response received")?;
                if let Some(code) = code {
                    write!(f, " ({})", code)?;
                }
                Ok(())
            }
            TransportFailure::Timeout { .. } => write!(f, "request timed out"),
            TransportFailure::HttpStatus { status, .. } => write!(f, "HTTP {}", status),
            TransportFailure::Other { message } => write!(f, "{}", message),
        }
    }
}

/// Sends a single request. Implementations never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor)
    -> Result<TransportResponse, TransportFailure>;
}

/// Production transport backed by `reqwest`.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn build(&self, request: &RequestDescriptor) -> reqwest::RequestBuilder {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        let is_multipart = matches!(request.body, Some(RequestBody::Multipart(_)));

        for (name, value) in &request.headers {
            // reqwest writes the multipart content type itself, boundary included
            if is_multipart && name.eq_ignore_ascii_case("content-type") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        match &request.body {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Multipart(form)) => builder.multipart(to_multipart(form)),
            None => builder,
        }
    }
}

fn to_multipart(form: &FormData) -> multipart::Form {
    form.parts()
        .iter()
        .fold(multipart::Form::new(), |acc, part| match part {
            FormPart::Text { name, value } => acc.text(name.clone(), value.clone()),
            FormPart::File {
                name,
                filename,
                content_type,
                bytes,
            } => {
                let file = multipart::Part::bytes(bytes.clone()).file_name(filename.clone());
                // An unparsable MIME string falls back to reqwest's default
                let file = match file.mime_str(content_type) {
                    Ok(part) => part,
                    Err(_) => multipart::Part::bytes(bytes.clone()).file_name(filename.clone()),
                };
                acc.part(name.clone(), file)
            }
        })
}

fn classify_reqwest_error(error: &reqwest::Error) -> TransportFailure {
    if error.is_timeout() {
        TransportFailure::Timeout {
            code: Some(TIMEOUT_CODE.to_string()),
        }
    } else if error.is_builder() {
        TransportFailure::Other {
            message: error.to_string(),
        }
    } else {
        // Connection, DNS and mid-body failures: the exchange never completed
        TransportFailure::NoResponse {
            code: Some(NETWORK_ERROR_CODE.to_string()),
        }
    }
}

/// Decodes a body as JSON, falling back to a string for non-JSON payloads.
pub fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(
        &self,
        request: &RequestDescriptor,
    ) -> Result<TransportResponse, TransportFailure> {
        let response = self
            .build(request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        debug!("{} {} -> {} ({} bytes)", request.method, request.url, status, bytes.len());

        Ok(TransportResponse {
            status,
            body: decode_body(&bytes),
        })
    }
}
