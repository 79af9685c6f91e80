//! Receiver registry for multi-provider webhook routing.
//!
//! This module provides [`ReceiverRegistry`] for associating provider names
//! (e.g. `"github"`, `"dropbox"`) with their [`WebhookReceiver`]
//! implementations. The registry is built once at startup from an explicit
//! list and used read-only during request handling.
//!
//! Lookups are case-insensitive: `"GitHub"` and `"github"` resolve to the
//! same receiver instance.

use crate::{receiver::WebhookReceiver, ReceiverName};
use std::{collections::HashMap, fmt, sync::Arc};
use tracing::info;

/// Errors raised while building a [`ReceiverRegistry`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("At least one webhook receiver must be registered")]
    Empty,

    #[error("Webhook receiver '{name}' is registered more than once")]
    Duplicate { name: String },
}

/// Registry mapping provider names to their webhook receivers.
///
/// All values are stored as `Arc<dyn WebhookReceiver>` to allow sharing
/// across async tasks and threads. The registry cannot be modified after
/// [`build`](Self::build), so concurrent reads need no synchronisation.
///
/// # Examples
///
/// ```rust
/// use hookgate_core::{HmacReceiver, HmacReceiverConfig, ReceiverRegistry, WebhookReceiver};
/// use std::sync::Arc;
///
/// let github: Arc<dyn WebhookReceiver> =
///     Arc::new(HmacReceiver::new(HmacReceiverConfig::new("github")).unwrap());
/// let registry = ReceiverRegistry::build([github]).unwrap();
///
/// assert!(registry.contains("GitHub"));
/// assert!(registry.get("dropbox").is_none());
/// ```
#[derive(Clone)]
pub struct ReceiverRegistry {
    receivers: HashMap<ReceiverName, Arc<dyn WebhookReceiver>>,
}

impl ReceiverRegistry {
    /// Build the registry from every receiver the deployment supports.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Empty`] when no receivers are given and
    /// [`RegistryError::Duplicate`] when two receivers share a name.
    pub fn build<I>(receivers: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = Arc<dyn WebhookReceiver>>,
    {
        let mut map = HashMap::new();
        for receiver in receivers {
            let name = receiver.name().clone();
            if map.contains_key(&name) {
                return Err(RegistryError::Duplicate {
                    name: name.to_string(),
                });
            }
            map.insert(name, receiver);
        }

        if map.is_empty() {
            return Err(RegistryError::Empty);
        }

        let registry = Self { receivers: map };
        info!(receivers = ?registry.names(), "Webhook receiver registry built");
        Ok(registry)
    }

    /// Look up a receiver by provider name, in any casing.
    ///
    /// Returns `None` if the name is not registered or is not a valid
    /// receiver name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn WebhookReceiver>> {
        let name = ReceiverName::new(name).ok()?;
        self.receivers.get(&name).cloned()
    }

    /// Check whether a receiver is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<ReceiverName> {
        let mut names: Vec<_> = self.receivers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }
}

impl fmt::Debug for ReceiverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiverRegistry")
            .field("receivers", &self.names())
            .finish()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
