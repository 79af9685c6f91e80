//! # Secret Resolution
//!
//! Supplies receivers with the key material needed to validate a function's
//! webhook requests. Values are resolved lazily from an external
//! [`SecretStore`] on every validation call; nothing is cached here.
//!
//! ## Setting names
//!
//! | Setting | Purpose |
//! |---------|---------|
//! | `webhook-{receiver}-{function}` | Per-function default key |
//! | `webhook-{receiver}` | Receiver-wide default key |
//! | override setting (receiver-defined) | Tri-state override, see below |
//!
//! ## Override rule
//!
//! When a receiver names an override setting:
//! - setting absent from the store: the default key applies
//! - setting present but empty: no key at all ([`SecretMaterial::Disabled`])
//! - setting present and non-empty: that value is used verbatim
//!
//! The empty case switches signature checking off for the function, so the
//! distinction between "absent" and "empty" must be preserved exactly.

use crate::ReceiverName;
use async_trait::async_trait;
use std::{fmt, sync::Arc};
use tracing::debug;
use zeroize::Zeroizing;

// ============================================================================
// SecretValue
// ============================================================================

/// Secure container for a secret value.
///
/// The value is never included in `Debug` output and its memory is zeroed
/// when the last copy is dropped.
#[derive(Clone)]
pub struct SecretValue {
    inner: Zeroizing<String>,
}

impl SecretValue {
    /// Create a secret value from a string, taking ownership of it.
    pub fn from_string(value: String) -> Self {
        Self {
            inner: Zeroizing::new(value),
        }
    }

    /// Get the secret as a string (only for immediate use).
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    /// Get the secret as bytes (only for immediate use).
    pub fn expose_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Length without exposing content.
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl From<&str> for SecretValue {
    fn from(value: &str) -> Self {
        Self::from_string(value.to_string())
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("length", &self.len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// SecretMaterial
// ============================================================================

/// Outcome of resolving the key for one function and receiver.
#[derive(Debug, Clone)]
pub enum SecretMaterial {
    /// Validate with this key.
    Key(SecretValue),

    /// Explicitly configured with no key; the receiver skips key-based checks.
    Disabled,

    /// No key configured anywhere for this function and receiver.
    NotConfigured,
}

impl SecretMaterial {
    /// The key, if one applies.
    pub fn key(&self) -> Option<&SecretValue> {
        match self {
            Self::Key(value) => Some(value),
            Self::Disabled | Self::NotConfigured => None,
        }
    }
}

// ============================================================================
// SecretStore
// ============================================================================

/// Errors raised by a [`SecretStore`].
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Secret store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Access denied to setting: {setting}")]
    AccessDenied { setting: String },

    #[error("Setting '{setting}' does not hold a valid value")]
    InvalidValue { setting: String },
}

/// External store of named settings holding secret material.
///
/// Implementations must be safe for concurrent reads; the gateway does not
/// coordinate access.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Look up a setting by name.
    ///
    /// Returns `Ok(None)` when the setting does not exist. An existing setting
    /// with an empty value must be returned as `Some` with an empty value,
    /// not as `None`.
    async fn get_setting(&self, name: &str) -> Result<Option<SecretValue>, SecretError>;
}

// ============================================================================
// ReceiverConfigProvider
// ============================================================================

/// Resolves secret material for receivers, keyed by function and provider.
#[derive(Clone)]
pub struct ReceiverConfigProvider {
    store: Arc<dyn SecretStore>,
}

impl ReceiverConfigProvider {
    /// Prefix shared by all default setting names.
    pub const SETTING_PREFIX: &'static str = "webhook";

    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Setting name for a function's default key.
    pub fn function_setting_name(receiver: &ReceiverName, function_id: &str) -> String {
        format!(
            "{}-{}-{}",
            Self::SETTING_PREFIX,
            receiver,
            function_id.to_lowercase()
        )
    }

    /// Setting name for a receiver-wide default key.
    pub fn receiver_setting_name(receiver: &ReceiverName) -> String {
        format!("{}-{}", Self::SETTING_PREFIX, receiver)
    }

    /// Resolve the key a receiver should use for `function_id`.
    ///
    /// See the module documentation for the override rule.
    ///
    /// ```rust
    /// use hookgate_core::{InMemorySecretStore, ReceiverConfigProvider, ReceiverName, SecretMaterial};
    /// use std::sync::Arc;
    ///
    /// # tokio_test::block_on(async {
    /// let store = InMemorySecretStore::with_settings([
    ///     ("webhook-github", "receiver-key"),
    ///     ("github-override", ""),
    /// ]);
    /// let provider = ReceiverConfigProvider::new(Arc::new(store));
    /// let github = ReceiverName::new("github").unwrap();
    ///
    /// let material = provider.get_secret("push", &github, None).await.unwrap();
    /// assert_eq!(material.key().unwrap().expose_secret(), "receiver-key");
    ///
    /// let material = provider
    ///     .get_secret("push", &github, Some("github-override"))
    ///     .await
    ///     .unwrap();
    /// assert!(matches!(material, SecretMaterial::Disabled));
    /// # });
    /// ```
    ///
    /// # Errors
    ///
    /// Propagates [`SecretError`] from the underlying store.
    pub async fn get_secret(
        &self,
        function_id: &str,
        receiver: &ReceiverName,
        override_setting: Option<&str>,
    ) -> Result<SecretMaterial, SecretError> {
        if let Some(setting) = override_setting {
            match self.store.get_setting(setting).await? {
                Some(value) if value.is_empty() => {
                    debug!(
                        receiver = %receiver,
                        setting = %setting,
                        "Override setting is empty; key-based validation disabled"
                    );
                    return Ok(SecretMaterial::Disabled);
                }
                Some(value) => return Ok(SecretMaterial::Key(value)),
                None => {}
            }
        }

        let function_setting = Self::function_setting_name(receiver, function_id);
        if let Some(value) = self.non_empty_setting(&function_setting).await? {
            return Ok(SecretMaterial::Key(value));
        }

        let receiver_setting = Self::receiver_setting_name(receiver);
        if let Some(value) = self.non_empty_setting(&receiver_setting).await? {
            return Ok(SecretMaterial::Key(value));
        }

        debug!(
            receiver = %receiver,
            function = %function_id,
            "No secret configured for function"
        );
        Ok(SecretMaterial::NotConfigured)
    }

    /// Default settings only count when they hold a value.
    async fn non_empty_setting(&self, name: &str) -> Result<Option<SecretValue>, SecretError> {
        Ok(self
            .store
            .get_setting(name)
            .await?
            .filter(|value| !value.is_empty()))
    }
}

impl fmt::Debug for ReceiverConfigProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiverConfigProvider").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;
