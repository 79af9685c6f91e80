//! Configuration types for the HTTP service
//!
//! Configuration is layered with the `config` crate. Later sources override
//! earlier ones:
//!
//! 1. `config/hookgate.yaml` (optional, relative to the working directory)
//! 2. an explicit file passed to [`load_config`] (required when given)
//! 3. environment variables prefixed `HOOKGATE__` with `__` separators, e.g.
//!    `HOOKGATE__SERVER__PORT=9090` sets `server.port`
//!
//! Every section carries serde defaults, so an absent file only needs to
//! supply the receivers and functions.

use crate::errors::ConfigError;
use hookgate_core::{
    gateway::DEFAULT_MAX_BODY_SIZE, FunctionWebhookBinding, HmacReceiverConfig, ReceiverName,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashSet},
    path::Path,
};
use tracing::info;

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "HOOKGATE";

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Webhook receivers to register, one per provider
    pub receivers: Vec<HmacReceiverConfig>,

    /// Functions reachable under `/api/{function}`
    pub functions: Vec<FunctionConfig>,

    /// Where receiver secrets are read from
    pub secrets: SecretSourceConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level or filter directive, used when `RUST_LOG` is unset
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// A function exposed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionConfig {
    pub name: String,

    /// Present when the function is a webhook endpoint.
    #[serde(default)]
    pub webhook: Option<FunctionWebhookConfig>,
}

/// Webhook settings of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionWebhookConfig {
    /// Provider name of the receiver validating this function's requests.
    pub receiver: String,
}

impl FunctionConfig {
    /// Binding consumed by the dispatch gateway.
    pub fn binding(&self) -> FunctionWebhookBinding {
        match &self.webhook {
            Some(webhook) => FunctionWebhookBinding::webhook(&self.name, &webhook.receiver),
            None => FunctionWebhookBinding::not_webhook(&self.name),
        }
    }
}

/// Source for receiver secrets.
///
/// In production deployments use [`SecretSourceConfig::Environment`] so that
/// secrets are supplied as app settings rather than committed configuration.
///
/// # Security
///
/// [`SecretSourceConfig::Literal`] is provided for development and testing
/// only. A startup `WARN` is emitted when literal secrets are active.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SecretSourceConfig {
    /// Settings read from environment variables.
    Environment {
        /// Prefix joined in front of every variable name.
        #[serde(default)]
        prefix: Option<String>,
    },

    /// Settings embedded in the configuration.
    ///
    /// **Development / testing only.** Never commit to source control.
    Literal {
        /// Setting name to value. Excluded from `Debug` output.
        #[serde(default)]
        values: BTreeMap<String, String>,
    },
}

impl Default for SecretSourceConfig {
    fn default() -> Self {
        Self::Environment { prefix: None }
    }
}

impl std::fmt::Debug for SecretSourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Environment { prefix } => f
                .debug_struct("SecretSourceConfig::Environment")
                .field("prefix", prefix)
                .finish(),
            Self::Literal { values } => f
                .debug_struct("SecretSourceConfig::Literal")
                .field("settings", &values.keys().collect::<Vec<_>>())
                .field("values", &"<REDACTED>")
                .finish(),
        }
    }
}

impl ServiceConfig {
    /// Check the configuration for errors that would prevent startup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when:
    /// - `server.max_body_size` is zero
    /// - no receivers are configured
    /// - a receiver configuration is invalid, or two receivers share a name
    /// - a function name is empty or used twice (case-insensitively)
    /// - a webhook function names a receiver that is not configured
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_body_size == 0 {
            return Err(invalid("server.max_body_size must be greater than zero"));
        }

        if self.receivers.is_empty() {
            return Err(invalid("at least one webhook receiver must be configured"));
        }

        let mut receiver_names = HashSet::new();
        for receiver in &self.receivers {
            receiver
                .validate()
                .map_err(|e| invalid(format!("receivers: {}", e)))?;
            let name = ReceiverName::new(&receiver.name)
                .map_err(|e| invalid(format!("receivers: {}", e)))?;
            if !receiver_names.insert(name) {
                return Err(invalid(format!(
                    "receiver '{}' is configured more than once",
                    receiver.name
                )));
            }
        }

        let mut function_names = HashSet::new();
        for function in &self.functions {
            if function.name.trim().is_empty() {
                return Err(invalid("function names must not be empty"));
            }
            if !function_names.insert(function.name.to_lowercase()) {
                return Err(invalid(format!(
                    "function '{}' is configured more than once",
                    function.name
                )));
            }
            if let Some(webhook) = &function.webhook {
                let known = ReceiverName::new(&webhook.receiver)
                    .map(|name| receiver_names.contains(&name))
                    .unwrap_or(false);
                if !known {
                    return Err(invalid(format!(
                        "function '{}' references unknown receiver '{}'",
                        function.name, webhook.receiver
                    )));
                }
            }
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        message: message.into(),
    }
}

/// Load, deserialize and validate the service configuration.
///
/// # Errors
///
/// Returns [`ConfigError::Load`] when a source cannot be read or coerced into
/// [`ServiceConfig`], and [`ConfigError::Invalid`] when validation fails.
pub fn load_config(explicit_path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut builder = config::Config::builder().add_source(
        config::File::with_name("config/hookgate")
            .required(false)
            .format(config::FileFormat::Yaml),
    );

    if let Some(path) = explicit_path {
        info!(path = %path.display(), "Loading configuration from explicit path");
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let service_config: ServiceConfig = builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?
        .try_deserialize()?;

    service_config.validate()?;
    Ok(service_config)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
