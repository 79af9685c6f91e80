//! # Dispatch Gateway
//!
//! Per-request orchestration of webhook validation and function invocation.
//!
//! [`DispatchGateway::handle`] takes a function's webhook binding, the
//! inbound request and a resume callback, and:
//!
//! 1. fails closed with `500` when the function is not a webhook,
//! 2. resolves the receiver by provider name (`500` when none matches),
//! 3. buffers the request body once (`413` over the limit, `400` on read
//!    failure),
//! 4. builds a [`ValidationContext`] carrying the resume callback,
//! 5. delegates to the receiver under the lower-cased function id and returns
//!    its response unchanged.
//!
//! Only invocation failures from the resume callback are returned as `Err`;
//! every other failure is already an HTTP response.

use crate::{
    error::GatewayError,
    receiver::{CompletionHandler, ResumeCallback, ResumeCompletion, ValidationContext},
    registry::ReceiverRegistry,
    request::{BufferedRequest, GatewayResponse},
    secrets::ReceiverConfigProvider,
    FunctionWebhookBinding,
};
use bytes::Bytes;
use http_body::Body;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Default body buffering limit: 10 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Gateway settings, fixed for the life of a [`DispatchGateway`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Largest request body, in bytes, that will be buffered.
    ///
    /// The whole body is held in memory while the receiver validates it and
    /// the function runs, so this bounds per-request memory use.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_max_body_size() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// Routes webhook requests through validation to function invocation.
///
/// Cheap to clone; all state is shared and immutable.
#[derive(Clone)]
pub struct DispatchGateway {
    config: GatewayConfig,
    registry: Arc<ReceiverRegistry>,
    secrets: Arc<ReceiverConfigProvider>,
    completion: Arc<dyn CompletionHandler>,
}

impl DispatchGateway {
    pub fn new(
        config: GatewayConfig,
        registry: ReceiverRegistry,
        secrets: ReceiverConfigProvider,
    ) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
            secrets: Arc::new(secrets),
            completion: Arc::new(ResumeCompletion),
        }
    }

    /// Replace the completion handler run after successful validation.
    pub fn with_completion_handler(mut self, completion: Arc<dyn CompletionHandler>) -> Self {
        self.completion = completion;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn registry(&self) -> &ReceiverRegistry {
        &self.registry
    }

    /// Dispatch one webhook request.
    ///
    /// The resume callback runs at most once, and only after the receiver
    /// has accepted the request. If the returned future is dropped before
    /// that point the callback is dropped unused.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Invocation`] when the resume callback fails.
    /// All other failures are returned as `Ok` with the mapped status code.
    #[instrument(
        skip(self, binding, request, resume),
        fields(function = %binding.function_id, receiver = %binding.receiver_name)
    )]
    pub async fn handle<B>(
        &self,
        binding: &FunctionWebhookBinding,
        request: http::Request<B>,
        resume: ResumeCallback,
    ) -> Result<GatewayResponse, GatewayError>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match self.dispatch(binding, request, resume).await {
            Ok(response) => {
                info!(status = response.status().as_u16(), "Webhook dispatch complete");
                Ok(response)
            }
            Err(e) if e.is_invocation_error() => {
                warn!(error = %e, "Function invocation failed after webhook validation");
                Err(e)
            }
            Err(e) => {
                if e.is_configuration_error() || e.status_code().is_server_error() {
                    error!(error = %e, "Webhook dispatch failed");
                } else {
                    warn!(error = %e, "Webhook request rejected");
                }
                Ok(e.to_response())
            }
        }
    }

    async fn dispatch<B>(
        &self,
        binding: &FunctionWebhookBinding,
        request: http::Request<B>,
        resume: ResumeCallback,
    ) -> Result<GatewayResponse, GatewayError>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if !binding.is_webhook {
            return Err(GatewayError::NotWebhook {
                function: binding.function_id.clone(),
            });
        }

        let receiver =
            self.registry
                .get(&binding.receiver_name)
                .ok_or_else(|| GatewayError::ReceiverNotFound {
                    receiver: binding.receiver_name.clone(),
                })?;

        let buffered =
            Arc::new(BufferedRequest::from_http(request, self.config.max_body_size).await?);

        let context = ValidationContext::new(
            receiver.name().clone(),
            binding.function_id.clone(),
            buffered,
            Arc::clone(&self.secrets),
            Arc::clone(&self.completion),
            resume,
        );

        receiver
            .receive(&binding.receiver_scoped_id(), context)
            .await
    }
}

impl std::fmt::Debug for DispatchGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchGateway")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
