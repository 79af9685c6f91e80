//! # In-Memory Secret Store
//!
//! Thread-safe in-memory settings store for testing and development.

use crate::secrets::{SecretError, SecretStore, SecretValue};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

/// Thread-safe in-memory secret store
///
/// Uses RwLock for concurrent access with minimal contention. Clones share
/// the same underlying settings, so tests can change values after handing
/// the store to a gateway.
#[derive(Clone, Default)]
pub struct InMemorySecretStore {
    settings: Arc<RwLock<HashMap<String, SecretValue>>>,
}

impl InMemorySecretStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store pre-populated with settings
    pub fn with_settings<I, K, V>(settings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = settings
            .into_iter()
            .map(|(name, value)| (name.into(), SecretValue::from_string(value.into())))
            .collect();

        Self {
            settings: Arc::new(RwLock::new(map)),
        }
    }

    /// Add or replace a setting. An empty value is stored as-is.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), SecretValue::from_string(value.into()));
    }

    /// Remove a setting, making it absent.
    pub fn remove(&self, name: &str) {
        self.settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    /// Number of stored settings
    pub fn len(&self) -> usize {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get_setting(&self, name: &str) -> Result<Option<SecretValue>, SecretError> {
        let settings = self.settings.read().map_err(|e| SecretError::Unavailable {
            message: format!("in-memory store lock poisoned: {}", e),
        })?;
        Ok(settings.get(name).cloned())
    }
}

impl fmt::Debug for InMemorySecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemorySecretStore")
            .field("settings", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "memory_secret_store_tests.rs"]
mod tests;
