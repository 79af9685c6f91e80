//! Tests for [`DispatchGateway`].

use super::*;
use crate::{
    adapters::InMemorySecretStore,
    error::InvocationError,
    receiver::{resume_callback, WebhookReceiver},
    request::text_response,
    ReceiverName,
};
use async_trait::async_trait;
use http::StatusCode;
use http_body_util::Full;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};
use std::time::Duration;

// ============================================================================
// Test receivers
// ============================================================================

#[derive(Clone, Copy)]
enum Behaviour {
    Accept,
    Reject,
    Pending,
    DropCallback,
    FailSecretLookup,
}

/// Receiver that records what it saw and then follows a fixed script.
struct ScriptedReceiver {
    name: ReceiverName,
    behaviour: Behaviour,
    seen: Mutex<Vec<(String, Bytes)>>,
}

impl ScriptedReceiver {
    fn new(name: &str, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            name: ReceiverName::new(name).unwrap(),
            behaviour,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<(String, Bytes)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookReceiver for ScriptedReceiver {
    fn name(&self) -> &ReceiverName {
        &self.name
    }

    async fn receive(
        &self,
        id: &str,
        mut context: ValidationContext,
    ) -> Result<GatewayResponse, GatewayError> {
        self.seen
            .lock()
            .unwrap()
            .push((id.to_string(), context.request().body().clone()));

        match self.behaviour {
            Behaviour::Accept => context.complete().await,
            Behaviour::Reject => Ok(text_response(StatusCode::UNAUTHORIZED, "bad signature")),
            Behaviour::Pending => {
                std::future::pending::<()>().await;
                context.complete().await
            }
            Behaviour::DropCallback => {
                drop(context.take_resume());
                context.complete().await
            }
            Behaviour::FailSecretLookup => Err(GatewayError::Secret(
                crate::secrets::SecretError::Unavailable {
                    message: "vault offline".to_string(),
                },
            )),
        }
    }
}

fn gateway_with(receivers: Vec<Arc<ScriptedReceiver>>) -> DispatchGateway {
    let registry = ReceiverRegistry::build(
        receivers
            .into_iter()
            .map(|r| r as Arc<dyn WebhookReceiver>),
    )
    .unwrap();
    let secrets = ReceiverConfigProvider::new(Arc::new(InMemorySecretStore::new()));
    DispatchGateway::new(GatewayConfig::default(), registry, secrets)
}

fn request(body: &'static str) -> http::Request<Full<Bytes>> {
    http::Request::builder()
        .method("POST")
        .uri("/api/foo")
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap()
}

/// Callback that counts invocations and echoes the body it was given.
fn echo_callback(calls: Arc<AtomicUsize>) -> ResumeCallback {
    resume_callback(move |request| async move {
        calls.fetch_add(1, Ordering::SeqCst);
        let mut response = http::Response::new(request.body().clone());
        *response.status_mut() = StatusCode::ACCEPTED;
        response
            .headers_mut()
            .insert("x-invoked", http::HeaderValue::from_static("true"));
        Ok(response)
    })
}

mod scenario_tests {
    use super::*;

    /// Verify a webhook function with an accepting receiver returns the
    /// callback's response unchanged, with the body preserved.
    #[tokio::test]
    async fn test_foo_valid_webhook_invokes_function() {
        let receiver = ScriptedReceiver::new("test", Behaviour::Accept);
        let gateway = gateway_with(vec![receiver.clone()]);
        let calls = Arc::new(AtomicUsize::new(0));

        let response = gateway
            .handle(
                &FunctionWebhookBinding::webhook("foo", "test"),
                request(r#"{"hello":"world"}"#),
                echo_callback(calls.clone()),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers().get("x-invoked").unwrap(), "true");
        assert_eq!(response.body().as_ref(), br#"{"hello":"world"}"#);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// Verify an unknown receiver fails closed without invoking.
    #[tokio::test]
    async fn test_bar_unknown_receiver_is_server_error() {
        let receiver = ScriptedReceiver::new("test", Behaviour::Accept);
        let gateway = gateway_with(vec![receiver.clone()]);
        let calls = Arc::new(AtomicUsize::new(0));

        let response = gateway
            .handle(
                &FunctionWebhookBinding::webhook("bar", "unknown"),
                request("{}"),
                echo_callback(calls.clone()),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(receiver.seen().is_empty());
    }

    /// Verify a non-webhook function fails closed regardless of receivers.
    #[tokio::test]
    async fn test_baz_not_webhook_is_server_error() {
        let receiver = ScriptedReceiver::new("test", Behaviour::Accept);
        let gateway = gateway_with(vec![receiver.clone()]);
        let calls = Arc::new(AtomicUsize::new(0));

        let mut binding = FunctionWebhookBinding::webhook("baz", "test");
        binding.is_webhook = false;

        let response = gateway
            .handle(&binding, request("{}"), echo_callback(calls.clone()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(receiver.seen().is_empty());
    }

    /// Verify server error responses do not disclose configuration details.
    #[tokio::test]
    async fn test_server_error_body_is_generic() {
        let gateway = gateway_with(vec![ScriptedReceiver::new("test", Behaviour::Accept)]);
        let calls = Arc::new(AtomicUsize::new(0));

        let response = gateway
            .handle(
                &FunctionWebhookBinding::webhook("bar", "secret-provider"),
                request("{}"),
                echo_callback(calls),
            )
            .await
            .unwrap();

        let body = String::from_utf8(response.body().to_vec()).unwrap();
        assert!(!body.contains("secret-provider"), "{body}");
    }
}

mod routing_tests {
    use super::*;

    /// Verify provider names resolve case-insensitively and receivers get the
    /// lower-cased function id.
    #[tokio::test]
    async fn test_receiver_lookup_is_case_insensitive() {
        let receiver = ScriptedReceiver::new("github", Behaviour::Accept);
        let gateway = gateway_with(vec![receiver.clone()]);
        let calls = Arc::new(AtomicUsize::new(0));

        let response = gateway
            .handle(
                &FunctionWebhookBinding::webhook("HandlePush", "GitHub"),
                request("{}"),
                echo_callback(calls.clone()),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let seen = receiver.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "handlepush");
    }

    /// Verify the receiver and the callback observe the same body bytes.
    #[tokio::test]
    async fn test_body_observed_by_receiver_and_callback() {
        let receiver = ScriptedReceiver::new("test", Behaviour::Accept);
        let gateway = gateway_with(vec![receiver.clone()]);
        let observed = Arc::new(Mutex::new(None));

        let sink = observed.clone();
        let resume = resume_callback(move |request| async move {
            *sink.lock().unwrap() = Some(request.body().clone());
            Ok(http::Response::new(Bytes::new()))
        });

        gateway
            .handle(
                &FunctionWebhookBinding::webhook("foo", "test"),
                request("payload-bytes"),
                resume,
            )
            .await
            .unwrap();

        let from_callback = observed.lock().unwrap().clone().unwrap();
        assert_eq!(receiver.seen()[0].1, from_callback);
        assert_eq!(from_callback.as_ref(), b"payload-bytes");
    }

    /// Verify a receiver's rejection is passed through without invoking.
    #[tokio::test]
    async fn test_rejection_passed_through() {
        let gateway = gateway_with(vec![ScriptedReceiver::new("test", Behaviour::Reject)]);
        let calls = Arc::new(AtomicUsize::new(0));

        let response = gateway
            .handle(
                &FunctionWebhookBinding::webhook("foo", "test"),
                request("{}"),
                echo_callback(calls.clone()),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.body().as_ref(), b"bad signature");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    /// Verify each receiver gets only its own functions' requests.
    #[tokio::test]
    async fn test_dispatch_selects_matching_receiver() {
        let github = ScriptedReceiver::new("github", Behaviour::Accept);
        let dropbox = ScriptedReceiver::new("dropbox", Behaviour::Reject);
        let gateway = gateway_with(vec![github.clone(), dropbox.clone()]);
        let calls = Arc::new(AtomicUsize::new(0));

        let response = gateway
            .handle(
                &FunctionWebhookBinding::webhook("sync", "dropbox"),
                request("{}"),
                echo_callback(calls.clone()),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(github.seen().is_empty());
        assert_eq!(dropbox.seen().len(), 1);
    }
}

mod failure_tests {
    use super::*;

    /// Verify invocation failures propagate to the caller as errors.
    #[tokio::test]
    async fn test_invocation_error_propagates() {
        let gateway = gateway_with(vec![ScriptedReceiver::new("test", Behaviour::Accept)]);
        let resume = resume_callback(|_request| async move {
            Err::<GatewayResponse, InvocationError>("function crashed".into())
        });

        let result = gateway
            .handle(
                &FunctionWebhookBinding::webhook("foo", "test"),
                request("{}"),
                resume,
            )
            .await;

        match result {
            Err(GatewayError::Invocation(source)) => {
                assert_eq!(source.to_string(), "function crashed")
            }
            other => panic!("expected Invocation error, got {:?}", other),
        }
    }

    /// Verify a completed context without a callback yields 500.
    #[tokio::test]
    async fn test_missing_callback_is_server_error() {
        let gateway = gateway_with(vec![ScriptedReceiver::new("test", Behaviour::DropCallback)]);
        let calls = Arc::new(AtomicUsize::new(0));

        let response = gateway
            .handle(
                &FunctionWebhookBinding::webhook("foo", "test"),
                request("{}"),
                echo_callback(calls.clone()),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    /// Verify secret store failures raised by a receiver become 500.
    #[tokio::test]
    async fn test_secret_failure_is_server_error() {
        let gateway =
            gateway_with(vec![ScriptedReceiver::new("test", Behaviour::FailSecretLookup)]);
        let calls = Arc::new(AtomicUsize::new(0));

        let response = gateway
            .handle(
                &FunctionWebhookBinding::webhook("foo", "test"),
                request("{}"),
                echo_callback(calls.clone()),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    /// Verify bodies above the limit are rejected before any receiver runs.
    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let receiver = ScriptedReceiver::new("test", Behaviour::Accept);
        let registry =
            ReceiverRegistry::build([receiver.clone() as Arc<dyn WebhookReceiver>]).unwrap();
        let gateway = DispatchGateway::new(
            GatewayConfig { max_body_size: 4 },
            registry,
            ReceiverConfigProvider::new(Arc::new(InMemorySecretStore::new())),
        );
        let calls = Arc::new(AtomicUsize::new(0));

        let response = gateway
            .handle(
                &FunctionWebhookBinding::webhook("foo", "test"),
                request("too large"),
                echo_callback(calls.clone()),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(receiver.seen().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    /// Verify an abandoned request never invokes the callback.
    #[tokio::test]
    async fn test_cancelled_dispatch_never_invokes() {
        let receiver = ScriptedReceiver::new("test", Behaviour::Pending);
        let gateway = gateway_with(vec![receiver.clone()]);
        let calls = Arc::new(AtomicUsize::new(0));
        let binding = FunctionWebhookBinding::webhook("foo", "test");

        let result = tokio::time::timeout(
            Duration::from_millis(50),
            gateway.handle(&binding, request("{}"), echo_callback(calls.clone())),
        )
        .await;

        assert!(result.is_err(), "dispatch should still be pending");
        assert_eq!(receiver.seen().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

mod config_tests {
    use super::*;

    #[test]
    fn test_default_limit_is_ten_mebibytes() {
        assert_eq!(GatewayConfig::default().max_body_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_config_deserializes_with_default() {
        let config: GatewayConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, GatewayConfig::default());
    }

    /// Verify a replacement completion handler is used by the gateway.
    #[tokio::test]
    async fn test_custom_completion_handler() {
        struct Accepted;

        #[async_trait]
        impl CompletionHandler for Accepted {
            async fn on_validated(
                &self,
                _context: ValidationContext,
            ) -> Result<GatewayResponse, GatewayError> {
                Ok(text_response(StatusCode::ACCEPTED, "queued"))
            }
        }

        let gateway = gateway_with(vec![ScriptedReceiver::new("test", Behaviour::Accept)])
            .with_completion_handler(Arc::new(Accepted));
        let calls = Arc::new(AtomicUsize::new(0));

        let response = gateway
            .handle(
                &FunctionWebhookBinding::webhook("foo", "test"),
                request("{}"),
                echo_callback(calls.clone()),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.body().as_ref(), b"queued");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
