//! Name to provider lookup, populated once at startup.

use gatehouse_core::{ProviderName, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::FlowError;
use crate::provider::Provider;

/// Registered providers, keyed by name.
///
/// The registry is filled before the server starts and is read-only
/// afterwards; share it behind an `Arc`.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<ProviderName, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider under its own name, replacing any earlier
    /// provider with the same name.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let name = provider.name().clone();
        if self.providers.insert(name.clone(), provider).is_some() {
            tracing::warn!(provider = %name, "replaced previously registered provider");
        }
    }

    /// Builder-style variant of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, provider: Arc<dyn Provider>) -> Self {
        self.register(provider);
        self
    }

    /// Resolves a provider by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>, FlowError> {
        name.parse::<ProviderName>()
            .ok()
            .and_then(|name| self.providers.get(&name).cloned())
            .ok_or_else(|| {
                FlowError::ProviderNotFound {
                    provider: name.to_string(),
                }
                .into()
            })
    }

    /// Returns the registered provider names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &ProviderName> {
        self.providers.keys()
    }

    /// Returns true if no providers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}
