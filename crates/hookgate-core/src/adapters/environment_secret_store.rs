//! # Environment Secret Store
//!
//! Reads settings from process environment variables, the way app settings
//! are surfaced to a hosted function runtime.
//!
//! Setting names are mapped to variable names by upper-casing them and
//! replacing `-` and `.` with `_`, so `webhook-github-foo` is read from
//! `WEBHOOK_GITHUB_FOO`. With a prefix configured the prefix is joined in
//! front with `_`, for example `HOOKGATE_WEBHOOK_GITHUB_FOO`.

use crate::secrets::{SecretError, SecretStore, SecretValue};
use async_trait::async_trait;
use std::env::{self, VarError};

/// Secret store backed by environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSecretStore {
    prefix: Option<String>,
}

impl EnvironmentSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read all settings from variables starting with `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: if prefix.is_empty() {
                None
            } else {
                Some(prefix)
            },
        }
    }

    /// Environment variable name for a setting.
    pub fn variable_name(&self, setting: &str) -> String {
        let normalized = normalize(setting);
        match &self.prefix {
            Some(prefix) => format!("{}_{}", normalize(prefix), normalized),
            None => normalized,
        }
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '-' | '.' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

#[async_trait]
impl SecretStore for EnvironmentSecretStore {
    async fn get_setting(&self, name: &str) -> Result<Option<SecretValue>, SecretError> {
        let variable = self.variable_name(name);
        match env::var(&variable) {
            Ok(value) => Ok(Some(SecretValue::from_string(value))),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(_)) => Err(SecretError::InvalidValue { setting: variable }),
        }
    }
}

#[cfg(test)]
#[path = "environment_secret_store_tests.rs"]
mod tests;
