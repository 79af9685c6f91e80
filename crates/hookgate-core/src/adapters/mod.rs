//! # Infrastructure Adapters
//!
//! Implementations of the [`SecretStore`](crate::secrets::SecretStore) interface.

pub mod environment_secret_store;
pub mod memory_secret_store;

pub use environment_secret_store::EnvironmentSecretStore;
pub use memory_secret_store::InMemorySecretStore;
