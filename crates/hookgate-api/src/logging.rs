//! Structured logging setup.

use crate::{config::LoggingConfig, errors::ServiceError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over [`LoggingConfig::level`]. Fails if a
/// subscriber is already installed or the level is not a valid filter.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ServiceError> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json_format {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    result.map_err(|e| ServiceError::Logging {
        message: e.to_string(),
    })
}

/// Filter from `RUST_LOG`, falling back to the configured level.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, ServiceError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.level).map_err(|e| ServiceError::Logging {
        message: format!("invalid log level '{}': {}", config.level, e),
    })
}
