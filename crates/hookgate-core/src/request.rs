//! Materialised webhook requests and response helpers.
//!
//! A request body stream can only be consumed once, but both the receiver and
//! the eventual function invocation need to read it. The gateway therefore
//! reads the body exactly once into a [`BufferedRequest`] and shares that value
//! by `Arc` with every later stage.
//!
//! # Memory bound
//!
//! Buffering holds the entire payload in memory, so usable payload size is
//! capped by [`GatewayConfig::max_body_size`](crate::gateway::GatewayConfig).
//! Requests above the limit are rejected with `413 Payload Too Large` before
//! any receiver runs.

use crate::error::GatewayError;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, Response, StatusCode, Uri, Version};
use http_body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};

/// HTTP response produced by receivers, the gateway and resume callbacks.
pub type GatewayResponse = Response<Bytes>;

// ============================================================================
// BufferedRequest
// ============================================================================

/// Inbound HTTP request with a fully buffered, re-readable body.
#[derive(Debug, Clone)]
pub struct BufferedRequest {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl BufferedRequest {
    /// Create a request from already-materialised parts.
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers,
            body,
        }
    }

    /// Read the body of `request` into memory, enforcing `max_body_size`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PayloadTooLarge`] when the body exceeds the
    /// limit and [`GatewayError::BodyRead`] when the body stream fails (for
    /// example because the client disconnected).
    pub async fn from_http<B>(
        request: http::Request<B>,
        max_body_size: usize,
    ) -> Result<Self, GatewayError>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = request.into_parts();

        let collected = Limited::new(body, max_body_size)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    GatewayError::PayloadTooLarge {
                        limit: max_body_size,
                    }
                } else {
                    GatewayError::BodyRead {
                        message: e.to_string(),
                    }
                }
            })?;

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body: collected.to_bytes(),
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Raw body bytes. Cloning the returned [`Bytes`] is cheap.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Get the first value of a query string parameter, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.uri.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Content type without parameters, lower-cased.
    pub fn content_type(&self) -> Option<String> {
        self.header(header::CONTENT_TYPE.as_str()).map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// Whether the content type is `application/json` or a `+json` suffix type.
    pub fn is_json(&self) -> bool {
        match self.content_type() {
            Some(ct) => ct == "application/json" || ct.ends_with("+json"),
            None => false,
        }
    }
}

// ============================================================================
// Response helpers
// ============================================================================

/// Build a plain-text response.
pub fn text_response(status: StatusCode, message: impl Into<String>) -> GatewayResponse {
    let mut response = Response::new(Bytes::from(message.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Build a JSON response from a value.
pub fn json_response(status: StatusCode, body: &serde_json::Value) -> GatewayResponse {
    let mut response = Response::new(Bytes::from(body.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
