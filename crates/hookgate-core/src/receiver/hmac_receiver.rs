//! Configuration-driven receiver for providers that sign payloads with a
//! shared secret.
//!
//! [`HmacReceiver`] handles any provider that sends an HMAC-SHA256 of the raw
//! body, hex-encoded in a request header. Everything provider-specific lives
//! in [`HmacReceiverConfig`], so new providers are added through
//! configuration alone.
//!
//! # Validation order
//!
//! 1. `GET` carrying the configured challenge query parameter: echo the value.
//! 2. HTTP method not in `allowed_methods`: `405 Method Not Allowed`.
//! 3. `require_json` and the content type is not JSON: `415`.
//! 4. Signature, when `signature_header` is configured (see below).
//! 5. Ping request (configured header and value): `200` without invocation.
//! 6. Otherwise the request is accepted and the function is invoked.
//!
//! # Signature outcomes
//!
//! | Secret / header | Response |
//! |-----------------|----------|
//! | secret disabled by empty override | check skipped |
//! | no secret configured | 500 |
//! | header missing | 401 |
//! | header not hex | 400 |
//! | HMAC mismatch | 401 |
//!
//! # Examples
//!
//! ```rust
//! use hookgate_core::receiver::HmacReceiverConfig;
//!
//! let config: HmacReceiverConfig = serde_json::from_value(serde_json::json!({
//!     "name": "github",
//!     "signature_header": "x-hub-signature-256",
//!     "signature_prefix": "sha256=",
//!     "ping": { "header": "x-github-event", "value": "ping" }
//! }))
//! .unwrap();
//!
//! assert_eq!(config.allowed_methods, vec!["POST".to_string()]);
//! assert!(config.require_json);
//! assert!(config.validate().is_ok());
//! ```

use super::{ValidationContext, WebhookReceiver};
use crate::{
    error::GatewayError,
    request::{text_response, BufferedRequest, GatewayResponse},
    secrets::SecretMaterial,
    InvalidReceiverNameError, ReceiverName,
};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use http::{header, HeaderName, HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, error, info, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

// ============================================================================
// HmacReceiverConfig
// ============================================================================

/// Configuration for one [`HmacReceiver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HmacReceiverConfig {
    /// Provider name, matched case-insensitively against function bindings.
    pub name: String,

    /// HTTP methods accepted for delivery.
    #[serde(default = "default_allowed_methods")]
    pub allowed_methods: Vec<String>,

    /// Reject requests whose content type is not JSON.
    #[serde(default = "default_require_json")]
    pub require_json: bool,

    /// Header carrying the hex-encoded HMAC-SHA256 of the body. When unset no
    /// signature check is made.
    #[serde(default)]
    pub signature_header: Option<String>,

    /// Prefix stripped from the signature header value, e.g. `sha256=`.
    #[serde(default)]
    pub signature_prefix: Option<String>,

    /// Setting that overrides the default secret for every function.
    #[serde(default)]
    pub secret_override: Option<String>,

    /// Requests matching this header are acknowledged without invocation.
    #[serde(default)]
    pub ping: Option<PingConfig>,

    /// Query parameter whose value is echoed back on `GET` requests.
    #[serde(default)]
    pub challenge_query_param: Option<String>,
}

/// Header identifying a provider's connectivity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingConfig {
    pub header: String,
    pub value: String,
}

fn default_allowed_methods() -> Vec<String> {
    vec!["POST".to_string()]
}

fn default_require_json() -> bool {
    true
}

/// Errors detected when validating a [`HmacReceiverConfig`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HmacReceiverConfigError {
    #[error("Invalid receiver name: {0}")]
    InvalidName(#[from] InvalidReceiverNameError),

    #[error("Receiver '{receiver}' must allow at least one HTTP method")]
    EmptyAllowedMethods { receiver: String },

    #[error("Receiver '{receiver}' has invalid HTTP method '{method}'")]
    InvalidMethod { receiver: String, method: String },

    #[error("Receiver '{receiver}' has invalid header name '{header}'")]
    InvalidHeader { receiver: String, header: String },

    #[error("Receiver '{receiver}' has an empty '{field}' setting")]
    EmptyValue { receiver: String, field: String },
}

impl HmacReceiverConfig {
    /// Create a config with defaults for everything but the name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allowed_methods: default_allowed_methods(),
            require_json: default_require_json(),
            signature_header: None,
            signature_prefix: None,
            secret_override: None,
            ping: None,
            challenge_query_param: None,
        }
    }

    /// Check the configuration for errors.
    pub fn validate(&self) -> Result<(), HmacReceiverConfigError> {
        HmacReceiver::new(self.clone()).map(|_| ())
    }

    fn empty_value(&self, field: &str) -> HmacReceiverConfigError {
        HmacReceiverConfigError::EmptyValue {
            receiver: self.name.clone(),
            field: field.to_string(),
        }
    }

    fn header_name(&self, header: &str) -> Result<HeaderName, HmacReceiverConfigError> {
        HeaderName::from_bytes(header.as_bytes()).map_err(|_| {
            HmacReceiverConfigError::InvalidHeader {
                receiver: self.name.clone(),
                header: header.to_string(),
            }
        })
    }
}

// ============================================================================
// HmacReceiver
// ============================================================================

/// Shared-secret webhook receiver.
#[derive(Debug, Clone)]
pub struct HmacReceiver {
    name: ReceiverName,
    allowed_methods: Vec<Method>,
    require_json: bool,
    signature_header: Option<HeaderName>,
    signature_prefix: Option<String>,
    secret_override: Option<String>,
    ping: Option<(HeaderName, String)>,
    challenge_query_param: Option<String>,
}

impl HmacReceiver {
    /// Build a receiver from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HmacReceiverConfigError`] for invalid names, methods or
    /// header names and for empty optional settings.
    pub fn new(config: HmacReceiverConfig) -> Result<Self, HmacReceiverConfigError> {
        let name = ReceiverName::new(&config.name)?;

        if config.allowed_methods.is_empty() {
            return Err(HmacReceiverConfigError::EmptyAllowedMethods {
                receiver: config.name.clone(),
            });
        }
        let allowed_methods = config
            .allowed_methods
            .iter()
            .map(|method| {
                Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| {
                    HmacReceiverConfigError::InvalidMethod {
                        receiver: config.name.clone(),
                        method: method.clone(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let signature_header = config
            .signature_header
            .as_deref()
            .map(|header| config.header_name(header))
            .transpose()?;

        let ping = match &config.ping {
            Some(ping) if ping.value.is_empty() => return Err(config.empty_value("ping.value")),
            Some(ping) => Some((config.header_name(&ping.header)?, ping.value.clone())),
            None => None,
        };

        if config.secret_override.as_deref() == Some("") {
            return Err(config.empty_value("secret_override"));
        }
        if config.challenge_query_param.as_deref() == Some("") {
            return Err(config.empty_value("challenge_query_param"));
        }

        Ok(Self {
            name,
            allowed_methods,
            require_json: config.require_json,
            signature_header,
            signature_prefix: config.signature_prefix.filter(|p| !p.is_empty()),
            secret_override: config.secret_override,
            ping,
            challenge_query_param: config.challenge_query_param,
        })
    }

    fn method_not_allowed(&self) -> GatewayResponse {
        let allow = self
            .allowed_methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        let mut response = text_response(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("The '{}' receiver does not accept this HTTP method", self.name),
        );
        if let Ok(value) = HeaderValue::from_str(&allow) {
            response.headers_mut().insert(header::ALLOW, value);
        }
        response
    }

    fn challenge_response(&self, request: &BufferedRequest) -> Option<GatewayResponse> {
        let param = self.challenge_query_param.as_deref()?;
        if request.method() != Method::GET {
            return None;
        }
        let challenge = request.query_param(param)?;
        Some(text_response(StatusCode::OK, challenge))
    }

    fn is_ping(&self, request: &BufferedRequest) -> bool {
        match &self.ping {
            Some((header, value)) => request
                .headers()
                .get(header)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.eq_ignore_ascii_case(value)),
            None => false,
        }
    }

    /// Check the request signature. Returns the rejection response, if any.
    fn check_signature(
        &self,
        header: &HeaderName,
        material: &SecretMaterial,
        request: &BufferedRequest,
    ) -> Option<GatewayResponse> {
        let secret = match material {
            SecretMaterial::Key(secret) => secret,
            SecretMaterial::Disabled => {
                debug!("Signature validation disabled for this function");
                return None;
            }
            SecretMaterial::NotConfigured => {
                error!("No webhook secret configured; cannot validate signature");
                return Some(text_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error occurred",
                ));
            }
        };

        let Some(signature) = request.headers().get(header).and_then(|v| v.to_str().ok()) else {
            warn!(header = %header, "Rejecting webhook without signature header");
            return Some(text_response(
                StatusCode::UNAUTHORIZED,
                format!("Missing '{}' header", header),
            ));
        };

        let hex_sig = match &self.signature_prefix {
            Some(prefix) => signature.strip_prefix(prefix.as_str()).unwrap_or(signature),
            None => signature,
        };
        let Ok(sig_bytes) = hex::decode(hex_sig.trim()) else {
            warn!(header = %header, "Rejecting webhook with malformed signature");
            return Some(text_response(
                StatusCode::BAD_REQUEST,
                format!("The '{}' header is not a valid hex-encoded signature", header),
            ));
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_bytes()) else {
            error!("Failed to initialise HMAC-SHA256");
            return Some(text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error occurred",
            ));
        };
        mac.update(request.body());

        if mac.verify_slice(&sig_bytes).is_err() {
            warn!("Rejecting webhook with mismatched signature");
            return Some(text_response(
                StatusCode::UNAUTHORIZED,
                "The webhook signature does not match the request body",
            ));
        }

        None
    }
}

#[async_trait]
impl WebhookReceiver for HmacReceiver {
    fn name(&self) -> &ReceiverName {
        &self.name
    }

    #[instrument(skip(self, context), fields(receiver = %self.name, function = %id))]
    async fn receive(
        &self,
        id: &str,
        context: ValidationContext,
    ) -> Result<GatewayResponse, GatewayError> {
        let request = context.shared_request();

        if let Some(response) = self.challenge_response(&request) {
            info!("Answered webhook subscription challenge");
            return Ok(response);
        }

        if !self.allowed_methods.contains(request.method()) {
            warn!(method = %request.method(), "Rejecting webhook with unsupported HTTP method");
            return Ok(self.method_not_allowed());
        }

        if self.require_json && !request.is_json() {
            warn!(
                content_type = ?request.content_type(),
                "Rejecting webhook with non-JSON content type"
            );
            return Ok(text_response(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "The webhook payload must be JSON",
            ));
        }

        if let Some(header) = &self.signature_header {
            let material = context
                .secrets()
                .get_secret(id, &self.name, self.secret_override.as_deref())
                .await?;
            if let Some(rejection) = self.check_signature(header, &material, &request) {
                return Ok(rejection);
            }
        }

        if self.is_ping(&request) {
            info!("Acknowledged webhook ping");
            return Ok(text_response(StatusCode::OK, "pong"));
        }

        debug!("Webhook accepted");
        context.complete().await
    }
}

#[cfg(test)]
#[path = "hmac_receiver_tests.rs"]
mod tests;
