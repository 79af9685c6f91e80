//! # Webhook Receivers
//!
//! The receiver plugin contract and the completion step that resumes function
//! invocation once a receiver has accepted a request.
//!
//! A receiver owns the request/response cycle while it validates: it either
//! builds a rejection response itself, or calls
//! [`ValidationContext::complete`] and returns whatever that produces. The
//! context carries the one-shot [`ResumeCallback`] supplied by the caller of
//! the gateway, so invocation can only happen from inside a successful
//! validation and at most once.

use crate::{
    error::{GatewayError, InvocationError},
    request::{BufferedRequest, GatewayResponse},
    secrets::ReceiverConfigProvider,
    ReceiverName,
};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::{fmt, future::Future, sync::Arc};
use tracing::{debug, error};

pub mod hmac_receiver;

pub use hmac_receiver::{HmacReceiver, HmacReceiverConfig, HmacReceiverConfigError, PingConfig};

// ============================================================================
// Resume callback
// ============================================================================

/// Future returned by a [`ResumeCallback`].
pub type ResumeFuture = BoxFuture<'static, Result<GatewayResponse, InvocationError>>;

/// Caller-supplied continuation that runs the function for a validated request.
///
/// `FnOnce` guarantees the callback can be consumed exactly once.
pub type ResumeCallback = Box<dyn FnOnce(Arc<BufferedRequest>) -> ResumeFuture + Send + Sync>;

/// Box an async closure as a [`ResumeCallback`].
///
/// # Examples
///
/// ```rust
/// use hookgate_core::resume_callback;
///
/// let callback = resume_callback(|request| async move {
///     Ok(http::Response::new(request.body().clone()))
/// });
/// # drop(callback);
/// ```
pub fn resume_callback<F, Fut>(callback: F) -> ResumeCallback
where
    F: FnOnce(Arc<BufferedRequest>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<GatewayResponse, InvocationError>> + Send + 'static,
{
    Box::new(move |request| callback(request).boxed())
}

// ============================================================================
// ValidationContext
// ============================================================================

/// Per-request state handed to a receiver.
///
/// Created by the gateway for a single request and consumed by
/// [`complete`](Self::complete). Dropping the context without completing it
/// drops the resume callback unused.
pub struct ValidationContext {
    receiver: ReceiverName,
    function_id: String,
    request: Arc<BufferedRequest>,
    secrets: Arc<ReceiverConfigProvider>,
    completion: Arc<dyn CompletionHandler>,
    resume: Option<ResumeCallback>,
}

impl ValidationContext {
    pub fn new(
        receiver: ReceiverName,
        function_id: impl Into<String>,
        request: Arc<BufferedRequest>,
        secrets: Arc<ReceiverConfigProvider>,
        completion: Arc<dyn CompletionHandler>,
        resume: ResumeCallback,
    ) -> Self {
        Self {
            receiver,
            function_id: function_id.into(),
            request,
            secrets,
            completion,
            resume: Some(resume),
        }
    }

    /// Name of the receiver the request was routed to.
    pub fn receiver(&self) -> &ReceiverName {
        &self.receiver
    }

    /// Function id as configured, before receiver scoping.
    pub fn function_id(&self) -> &str {
        &self.function_id
    }

    /// The buffered request.
    pub fn request(&self) -> &BufferedRequest {
        &self.request
    }

    /// Shared handle to the buffered request.
    pub fn shared_request(&self) -> Arc<BufferedRequest> {
        Arc::clone(&self.request)
    }

    /// Secret resolution for this request's receiver.
    pub fn secrets(&self) -> &ReceiverConfigProvider {
        &self.secrets
    }

    pub fn has_resume_callback(&self) -> bool {
        self.resume.is_some()
    }

    /// Remove the resume callback. Returns `None` if it was already taken.
    pub fn take_resume(&mut self) -> Option<ResumeCallback> {
        self.resume.take()
    }

    /// Signal that validation succeeded and run the completion handler.
    ///
    /// Receivers call this once a request has passed every check and return
    /// the result unchanged.
    pub async fn complete(self) -> Result<GatewayResponse, GatewayError> {
        let completion = Arc::clone(&self.completion);
        completion.on_validated(self).await
    }
}

impl fmt::Debug for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("receiver", &self.receiver)
            .field("function_id", &self.function_id)
            .field("method", self.request.method())
            .field("body_len", &self.request.body().len())
            .field("has_resume_callback", &self.has_resume_callback())
            .finish()
    }
}

// ============================================================================
// Completion
// ============================================================================

/// Extension point invoked after a receiver accepts a request.
#[async_trait]
pub trait CompletionHandler: Send + Sync {
    async fn on_validated(
        &self,
        context: ValidationContext,
    ) -> Result<GatewayResponse, GatewayError>;
}

/// Completion handler that runs the context's resume callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResumeCompletion;

#[async_trait]
impl CompletionHandler for ResumeCompletion {
    async fn on_validated(
        &self,
        mut context: ValidationContext,
    ) -> Result<GatewayResponse, GatewayError> {
        let Some(resume) = context.take_resume() else {
            error!(
                function = %context.function_id(),
                receiver = %context.receiver(),
                "Webhook validated but the request context carries no resume callback"
            );
            return Err(GatewayError::MissingResumeCallback {
                function: context.function_id().to_string(),
            });
        };

        debug!(
            function = %context.function_id(),
            receiver = %context.receiver(),
            "Webhook validated, resuming function invocation"
        );

        let request = context.shared_request();
        resume(request).await.map_err(GatewayError::Invocation)
    }
}

// ============================================================================
// Receiver contract
// ============================================================================

/// Provider-specific webhook validator.
///
/// Implementations are stateless with respect to individual requests and are
/// shared across all concurrent requests for the life of the process.
#[async_trait]
pub trait WebhookReceiver: Send + Sync {
    /// Provider name this receiver is registered under.
    fn name(&self) -> &ReceiverName;

    /// Validate a request for the function identified by `id`.
    ///
    /// On success the receiver must return the result of
    /// [`ValidationContext::complete`]. On rejection it returns its own
    /// response without completing.
    async fn receive(
        &self,
        id: &str,
        context: ValidationContext,
    ) -> Result<GatewayResponse, GatewayError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
