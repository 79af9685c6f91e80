//! # Hookgate HTTP Service
//!
//! HTTP surface for the Hookgate webhook dispatch gateway.
//!
//! This crate provides:
//! - `POST|GET|PUT /api/{function}`: webhook dispatch for catalogued functions
//! - `GET /health`: liveness and the registered receivers
//! - layered configuration loading and validation
//! - logging initialisation and service wiring helpers
//!
//! The function invocation itself is supplied by the embedding application
//! through [`FunctionInvoker`].

pub mod catalog;
pub mod config;
pub mod errors;
pub mod logging;

pub use catalog::{FunctionCatalog, FunctionInvoker, StaticFunctionCatalog};
pub use config::{
    load_config, FunctionConfig, FunctionWebhookConfig, LoggingConfig, SecretSourceConfig,
    ServerConfig, ServiceConfig,
};
pub use errors::{ApiError, ConfigError, ServiceError};
pub use logging::init_logging;

use axum::{
    body::Body,
    extract::{Path, Request, State},
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use hookgate_core::{
    resume_callback, DispatchGateway, EnvironmentSecretStore, GatewayConfig, HmacReceiver,
    InMemorySecretStore, ReceiverConfigProvider, ReceiverRegistry, SecretStore, WebhookReceiver,
};
use serde::{Deserialize, Serialize};
use std::{future::IntoFuture, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<DispatchGateway>,
    pub catalog: Arc<dyn FunctionCatalog>,
    pub invoker: Arc<dyn FunctionInvoker>,
}

impl AppState {
    pub fn new(
        gateway: DispatchGateway,
        catalog: Arc<dyn FunctionCatalog>,
        invoker: Arc<dyn FunctionInvoker>,
    ) -> Self {
        Self {
            gateway: Arc::new(gateway),
            catalog,
            invoker,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub receivers: Vec<String>,
}

// ============================================================================
// Router
// ============================================================================

/// Create the HTTP router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/{function}",
            post(handle_function_request)
                .get(handle_function_request)
                .put(handle_function_request),
        )
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Dispatch a request for a catalogued function through the gateway.
///
/// The resume callback handed to the gateway calls the configured
/// [`FunctionInvoker`]; it only runs once the function's receiver has
/// accepted the request.
#[instrument(skip(state, request))]
pub async fn handle_function_request(
    State(state): State<AppState>,
    Path(function): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let binding = state
        .catalog
        .lookup(&function)
        .ok_or(ApiError::FunctionNotFound { function })?;

    let invoker = Arc::clone(&state.invoker);
    let function_id = binding.function_id.clone();
    let resume = resume_callback(move |request| async move {
        invoker.invoke(&function_id, request).await
    });

    let response = state.gateway.handle(&binding, request, resume).await?;
    Ok(response.map(Body::from))
}

/// Basic health check
#[instrument(skip(state))]
pub async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        receivers: state
            .gateway
            .registry()
            .names()
            .into_iter()
            .map(String::from)
            .collect(),
    })
}

// ============================================================================
// Service wiring
// ============================================================================

/// Register every configured receiver.
pub fn build_registry(config: &ServiceConfig) -> Result<ReceiverRegistry, ConfigError> {
    let receivers = config
        .receivers
        .iter()
        .map(|receiver_config| {
            let receiver = HmacReceiver::new(receiver_config.clone()).map_err(|e| {
                ConfigError::Invalid {
                    message: format!("receivers: {}", e),
                }
            })?;
            info!(receiver = %receiver.name(), "Registered webhook receiver from config");
            Ok(Arc::new(receiver) as Arc<dyn WebhookReceiver>)
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    ReceiverRegistry::build(receivers).map_err(|e| ConfigError::Invalid {
        message: e.to_string(),
    })
}

/// Create the secret store described by the configuration.
pub fn build_secret_store(config: &SecretSourceConfig) -> Arc<dyn SecretStore> {
    match config {
        SecretSourceConfig::Environment { prefix } => match prefix {
            Some(prefix) => Arc::new(EnvironmentSecretStore::with_prefix(prefix.clone())),
            None => Arc::new(EnvironmentSecretStore::new()),
        },
        SecretSourceConfig::Literal { values } => {
            warn!(
                settings = values.len(),
                "Literal webhook secrets are active; use environment secrets in production"
            );
            Arc::new(InMemorySecretStore::with_settings(values.clone()))
        }
    }
}

/// Build the dispatch gateway for a configuration.
pub fn build_gateway(
    config: &ServiceConfig,
    secret_store: Arc<dyn SecretStore>,
) -> Result<DispatchGateway, ConfigError> {
    let registry = build_registry(config)?;
    let gateway_config = GatewayConfig {
        max_body_size: config.server.max_body_size,
    };

    Ok(DispatchGateway::new(
        gateway_config,
        registry,
        ReceiverConfigProvider::new(secret_store),
    ))
}

/// Build the full application state for a configuration.
pub fn build_app_state(
    config: &ServiceConfig,
    invoker: Arc<dyn FunctionInvoker>,
) -> Result<AppState, ConfigError> {
    config.validate()?;

    let gateway = build_gateway(config, build_secret_store(&config.secrets))?;
    let catalog = StaticFunctionCatalog::from_config(&config.functions);
    info!(functions = catalog.len(), "Function catalog loaded");

    Ok(AppState::new(gateway, Arc::new(catalog), invoker))
}

// ============================================================================
// Server
// ============================================================================

/// Start HTTP server
///
/// Serves until Ctrl+C or SIGTERM, then stops accepting connections and
/// waits up to `shutdown_timeout_seconds` for in-flight requests.
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<(), ServiceError> {
    let address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", address);

    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_seconds);
    let signalled = Arc::new(tokio::sync::Notify::new());
    let trigger = Arc::clone(&signalled);

    let server = axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!(
                "Initiating graceful shutdown with {}s timeout",
                shutdown_timeout.as_secs()
            );
            trigger.notify_one();
        })
        .into_future();
    tokio::pin!(server);

    let result = tokio::select! {
        result = &mut server => result,
        _ = signalled.notified() => {
            match tokio::time::timeout(shutdown_timeout, &mut server).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Graceful shutdown timed out; abandoning in-flight requests");
                    Ok(())
                }
            }
        }
    };

    result.map_err(|e| ServiceError::ServerFailed {
        message: e.to_string(),
    })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
