//! # Hookgate Core
//!
//! Core logic for the Hookgate webhook dispatch gateway.
//!
//! An inbound HTTP request destined for a named function is checked against
//! the function's webhook binding, routed to the matching provider receiver,
//! validated by that receiver, and only then handed to a caller-supplied
//! resume callback that performs the actual invocation.
//!
//! ## Architecture
//!
//! - [`registry::ReceiverRegistry`] maps provider names to receivers
//! - [`secrets::ReceiverConfigProvider`] resolves per-function secret material
//! - [`gateway::DispatchGateway`] orchestrates a single request
//! - [`receiver::CompletionHandler`] resumes the invocation after validation
//!
//! ## Usage
//!
//! ```rust
//! use hookgate_core::{FunctionWebhookBinding, ReceiverName};
//!
//! let name = ReceiverName::new("GitHub").unwrap();
//! assert_eq!(name.as_str(), "github");
//!
//! let binding = FunctionWebhookBinding::webhook("HandlePush", "github");
//! assert_eq!(binding.receiver_scoped_id(), "handlepush");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ReceiverName
// ============================================================================

/// Case-insensitive identifier for a webhook provider.
///
/// Names are normalised to lowercase on construction so that `"GitHub"` and
/// `"github"` compare equal. A name must be non-empty and consist of ASCII
/// letters, digits, hyphens (`-`) or underscores (`_`).
///
/// # Examples
///
/// ```rust
/// use hookgate_core::ReceiverName;
///
/// assert_eq!(ReceiverName::new("Dropbox").unwrap(), ReceiverName::new("dropbox").unwrap());
/// assert!(ReceiverName::new("").is_err());
/// assert!(ReceiverName::new("../escape").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReceiverName(String);

impl ReceiverName {
    /// Create a new receiver name, lower-casing the input.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidReceiverNameError::Empty`] for an empty value and
    /// [`InvalidReceiverNameError::InvalidChars`] when the value contains
    /// characters outside `[A-Za-z0-9\-_]`.
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidReceiverNameError> {
        let value = value.into();
        if value.is_empty() {
            return Err(InvalidReceiverNameError::Empty);
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(InvalidReceiverNameError::InvalidChars { value });
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    /// Return the normalised name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiverName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ReceiverName {
    type Err = InvalidReceiverNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ReceiverName {
    type Error = InvalidReceiverNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReceiverName> for String {
    fn from(name: ReceiverName) -> Self {
        name.0
    }
}

/// Error returned when a [`ReceiverName`] cannot be created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidReceiverNameError {
    #[error("Receiver name must not be empty")]
    Empty,

    #[error(
        "Receiver name '{value}' contains invalid characters; \
         use alphanumeric, hyphens, or underscores"
    )]
    InvalidChars { value: String },
}

// ============================================================================
// FunctionWebhookBinding
// ============================================================================

/// Webhook configuration for a single function.
///
/// Supplied by the function catalog and treated as read-only input by the
/// gateway. `receiver_name` is kept as a raw string because it comes from
/// external configuration; the gateway resolves it against the registry and
/// fails closed when it does not match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionWebhookBinding {
    /// Function name as configured (original casing).
    pub function_id: String,

    /// Whether the function is exposed as a webhook endpoint.
    pub is_webhook: bool,

    /// Provider name of the receiver that validates this function's requests.
    pub receiver_name: String,
}

impl FunctionWebhookBinding {
    /// Binding for a function exposed through the named receiver.
    pub fn webhook(function_id: impl Into<String>, receiver_name: impl Into<String>) -> Self {
        Self {
            function_id: function_id.into(),
            is_webhook: true,
            receiver_name: receiver_name.into(),
        }
    }

    /// Binding for a function that is not a webhook.
    pub fn not_webhook(function_id: impl Into<String>) -> Self {
        Self {
            function_id: function_id.into(),
            is_webhook: false,
            receiver_name: String::new(),
        }
    }

    /// Identifier handed to receivers: the lower-cased function name.
    ///
    /// Secret lookups are keyed by this value so that inconsistent casing in
    /// function names resolves to the same settings.
    pub fn receiver_scoped_id(&self) -> String {
        self.function_id.to_lowercase()
    }
}

// ============================================================================
// Module declarations
// ============================================================================

/// Secret store adapters
pub mod adapters;

/// Error types shared across the gateway
pub mod error;

/// Per-request dispatch orchestration
pub mod gateway;

/// Receiver plugin contract and completion adapter
pub mod receiver;

/// Case-insensitive receiver registry
pub mod registry;

/// Buffered request and response helpers
pub mod request;

/// Secret material resolution
pub mod secrets;

// Re-export key types for convenience
pub use adapters::{EnvironmentSecretStore, InMemorySecretStore};
pub use error::{GatewayError, InvocationError};
pub use gateway::{DispatchGateway, GatewayConfig};
pub use receiver::{
    resume_callback, CompletionHandler, HmacReceiver, HmacReceiverConfig,
    HmacReceiverConfigError, PingConfig, ResumeCallback, ResumeCompletion, ValidationContext,
    WebhookReceiver,
};
pub use registry::{ReceiverRegistry, RegistryError};
pub use request::{BufferedRequest, GatewayResponse};
pub use secrets::{ReceiverConfigProvider, SecretError, SecretMaterial, SecretStore, SecretValue};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
