//! Function lookup and invocation seams.
//!
//! The gateway itself never decides which functions exist or how they run.
//! [`FunctionCatalog`] answers the first question and [`FunctionInvoker`] the
//! second; the HTTP layer wires both around a
//! [`DispatchGateway`](hookgate_core::DispatchGateway).

use crate::config::FunctionConfig;
use async_trait::async_trait;
use hookgate_core::{BufferedRequest, FunctionWebhookBinding, GatewayResponse, InvocationError};
use std::{collections::HashMap, sync::Arc};

/// Lookup of function webhook bindings by name.
pub trait FunctionCatalog: Send + Sync {
    /// Binding for `function`, matched case-insensitively.
    fn lookup(&self, function: &str) -> Option<FunctionWebhookBinding>;
}

/// Runs a function for a validated request.
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    /// Invoke `function` with the buffered request and return its response.
    async fn invoke(
        &self,
        function: &str,
        request: Arc<BufferedRequest>,
    ) -> Result<GatewayResponse, InvocationError>;
}

/// Fixed catalog, usually built from [`ServiceConfig::functions`](crate::config::ServiceConfig).
#[derive(Debug, Clone, Default)]
pub struct StaticFunctionCatalog {
    functions: HashMap<String, FunctionWebhookBinding>,
}

impl StaticFunctionCatalog {
    pub fn new<I>(bindings: I) -> Self
    where
        I: IntoIterator<Item = FunctionWebhookBinding>,
    {
        Self {
            functions: bindings
                .into_iter()
                .map(|binding| (binding.function_id.to_lowercase(), binding))
                .collect(),
        }
    }

    pub fn from_config(functions: &[FunctionConfig]) -> Self {
        Self::new(functions.iter().map(FunctionConfig::binding))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl FunctionCatalog for StaticFunctionCatalog {
    fn lookup(&self, function: &str) -> Option<FunctionWebhookBinding> {
        self.functions.get(&function.to_lowercase()).cloned()
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
