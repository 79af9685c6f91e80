//! Error types for webhook dispatch.
//!
//! [`GatewayError`] covers every failure the gateway itself can detect.
//! Provider-specific rejections are not errors at this level: receivers build
//! those responses themselves and the gateway passes them through unmodified.

use crate::request::{json_response, GatewayResponse};
use crate::secrets::SecretError;
use http::StatusCode;

/// Error raised by a resume callback while running the function.
///
/// The gateway does not interpret these; they are propagated to the caller,
/// which owns the mapping of invocation failures to HTTP responses.
pub type InvocationError = Box<dyn std::error::Error + Send + Sync>;

/// Failures detected while dispatching a webhook request.
///
/// # Status mapping
///
/// | Variant | Status |
/// |---------|--------|
/// | `NotWebhook`, `ReceiverNotFound` | 500 (configuration defect) |
/// | `PayloadTooLarge` | 413 |
/// | `BodyRead` | 400 |
/// | `Secret` | 500 |
/// | `MissingResumeCallback` | 500 (invariant violation) |
/// | `Invocation` | 500, but returned to the caller as an error |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Function '{function}' is not configured as a webhook")]
    NotWebhook { function: String },

    #[error("Webhook receiver '{receiver}' is not registered")]
    ReceiverNotFound { receiver: String },

    #[error("Request body exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error("Failed to read request body: {message}")]
    BodyRead { message: String },

    #[error("Secret resolution failed: {0}")]
    Secret(#[from] SecretError),

    #[error("Webhook for function '{function}' validated but no resume callback was present")]
    MissingResumeCallback { function: String },

    #[error("Function invocation failed: {0}")]
    Invocation(#[source] InvocationError),
}

impl GatewayError {
    /// HTTP status code this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotWebhook { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ReceiverNotFound { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BodyRead { .. } => StatusCode::BAD_REQUEST,
            Self::Secret(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MissingResumeCallback { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Invocation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the error indicates a deployment or configuration defect.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::NotWebhook { .. } | Self::ReceiverNotFound { .. })
    }

    /// Whether the error was raised by the resume callback.
    pub fn is_invocation_error(&self) -> bool {
        matches!(self, Self::Invocation(_))
    }

    /// Build the HTTP response for this error.
    ///
    /// Server-side failures get a generic message so configuration details
    /// are not disclosed to webhook senders.
    pub fn to_response(&self) -> GatewayResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            "Internal server error occurred".to_string()
        } else {
            self.to_string()
        };

        json_response(
            status,
            &serde_json::json!({
                "error": message,
                "status": status.as_u16(),
            }),
        )
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
