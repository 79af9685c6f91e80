//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use hookgate_core::GatewayError;
use tracing::{error, warn};

/// Request handler errors with HTTP status code mapping
///
/// - `404 Not Found`: the function is not in the catalog
/// - Gateway failures keep the status the gateway assigns them; invocation
///   failures raised after validation map to `500 Internal Server Error`
///
/// # Security Considerations
///
/// Messages for server-side failures are replaced with a generic message.
/// Details are logged server-side only.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No function with this name is configured.
    #[error("Function not found: {function}")]
    FunctionNotFound { function: String },

    /// Dispatch or invocation failed.
    #[error("Webhook dispatch failed: {0}")]
    Gateway(#[from] GatewayError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::FunctionNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Gateway(e) => e.status_code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::FunctionNotFound { function } => {
                warn!(function = %function, "Request for unknown function");
                self.to_string()
            }
            Self::Gateway(e) if status.is_server_error() => {
                error!(error = %e, "Internal server error occurred");
                "Internal server error occurred".to_string()
            }
            Self::Gateway(e) => e.to_string(),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Failed to initialise logging: {message}")]
    Logging { message: String },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
