//! Common test utilities for hookgate integration tests
//!
//! This module provides:
//! - Mock implementations of traits (FunctionInvoker, WebhookReceiver)
//! - Helpers for signing payloads and building requests
//! - Shared configuration builders

use async_trait::async_trait;
use axum::body::Body;
use bytes::Bytes;
use hmac::{Hmac, Mac};
use hookgate_api::{
    FunctionConfig, FunctionInvoker, FunctionWebhookConfig, SecretSourceConfig, ServiceConfig,
};
use hookgate_core::{
    BufferedRequest, GatewayError, GatewayResponse, HmacReceiverConfig, InvocationError,
    PingConfig, ReceiverName, ValidationContext, WebhookReceiver,
};
use http::{Request, StatusCode};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub const GITHUB_SECRET: &str = "integration-secret";

// ============================================================================
// Mock Function Invoker
// ============================================================================

/// Invoker that records every call and echoes the request body.
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingInvoker {
    calls: Mutex<Vec<(String, Bytes)>>,
}

#[allow(dead_code)]
impl RecordingInvoker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<(String, Bytes)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl FunctionInvoker for RecordingInvoker {
    async fn invoke(
        &self,
        function: &str,
        request: Arc<BufferedRequest>,
    ) -> Result<GatewayResponse, InvocationError> {
        self.calls
            .lock()
            .unwrap()
            .push((function.to_string(), request.body().clone()));

        let mut response = http::Response::new(request.body().clone());
        *response.status_mut() = StatusCode::OK;
        response
            .headers_mut()
            .insert("x-function", function.parse()?);
        Ok(response)
    }
}

// ============================================================================
// Scripted Receiver
// ============================================================================

/// What a [`ScriptedReceiver`] does with each request.
#[derive(Clone, Copy, Debug)]
#[allow(dead_code)]
pub enum ReceiverBehaviour {
    /// Accept every request.
    Accept,
    /// Reject every request with 401.
    Reject,
    /// Never finish validating.
    Pending,
}

/// Receiver with fixed behaviour that counts the requests it sees.
#[allow(dead_code)]
pub struct ScriptedReceiver {
    name: ReceiverName,
    behaviour: ReceiverBehaviour,
    received: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedReceiver {
    pub fn new(name: &str, behaviour: ReceiverBehaviour) -> Arc<Self> {
        Arc::new(Self {
            name: ReceiverName::new(name).unwrap(),
            behaviour,
            received: Mutex::new(Vec::new()),
        })
    }

    /// Receiver-scoped ids of every request seen.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
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
        context: ValidationContext,
    ) -> Result<GatewayResponse, GatewayError> {
        self.received.lock().unwrap().push(id.to_string());

        match self.behaviour {
            ReceiverBehaviour::Accept => context.complete().await,
            ReceiverBehaviour::Reject => {
                let mut response = http::Response::new(Bytes::from_static(b"rejected"));
                *response.status_mut() = StatusCode::UNAUTHORIZED;
                Ok(response)
            }
            ReceiverBehaviour::Pending => {
                std::future::pending::<()>().await;
                context.complete().await
            }
        }
    }
}

// ============================================================================
// Configuration and request helpers
// ============================================================================

/// GitHub-style receiver: signed, JSON only, with ping support.
#[allow(dead_code)]
pub fn github_receiver_config() -> HmacReceiverConfig {
    HmacReceiverConfig {
        signature_header: Some("x-hub-signature-256".to_string()),
        signature_prefix: Some("sha256=".to_string()),
        secret_override: Some("github-override".to_string()),
        ping: Some(PingConfig {
            header: "x-github-event".to_string(),
            value: "ping".to_string(),
        }),
        ..HmacReceiverConfig::new("github")
    }
}

/// Service with a GitHub receiver, one webhook function and one plain function.
#[allow(dead_code)]
pub fn service_config(secrets: BTreeMap<String, String>) -> ServiceConfig {
    ServiceConfig {
        receivers: vec![github_receiver_config()],
        functions: vec![
            FunctionConfig {
                name: "HandlePush".to_string(),
                webhook: Some(FunctionWebhookConfig {
                    receiver: "GitHub".to_string(),
                }),
            },
            FunctionConfig {
                name: "report".to_string(),
                webhook: None,
            },
        ],
        secrets: SecretSourceConfig::Literal { values: secrets },
        ..ServiceConfig::default()
    }
}

/// Literal secrets with the receiver-wide GitHub key set.
#[allow(dead_code)]
pub fn github_secrets() -> BTreeMap<String, String> {
    BTreeMap::from([("webhook-github".to_string(), GITHUB_SECRET.to_string())])
}

/// Hex HMAC-SHA256 of `body` with the `sha256=` prefix.
#[allow(dead_code)]
pub fn sign(secret: &str, body: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// JSON POST signed with `secret`.
#[allow(dead_code)]
pub fn signed_request(uri: &str, secret: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-hub-signature-256", sign(secret, body))
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Collect a response body.
#[allow(dead_code)]
pub async fn body_bytes(response: axum::response::Response) -> Bytes {
    use http_body_util::BodyExt;
    response.into_body().collect().await.unwrap().to_bytes()
}
