//! Begin-auth, complete-auth and logout for one provider per browser session.
//!
//! Per provider and browser session the flow moves through three states:
//!
//! ```text
//! NoSession --begin_auth--> AuthPending --complete_auth--> AuthComplete
//!     ^                          |                              |
//!     +------- failure ----------+---------- logout ------------+
//! ```
//!
//! `AuthPending` and `AuthComplete` are both represented by a provider blob
//! in the session store; they differ only in whether the blob holds tokens.

use gatehouse_core::{ProviderName, Result};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::{debug, instrument};

use crate::error::FlowError;
use crate::provider::{CallbackParams, UserProfile};
use crate::registry::ProviderRegistry;
use crate::state::{StateTokens, validate_state};
use crate::store::SessionAdapter;

/// Drives OAuth flows against the registered providers.
///
/// All dependencies are passed in at construction; the orchestrator holds no
/// per-request state and is shared across requests behind an `Arc`.
#[derive(Debug)]
pub struct Orchestrator {
    providers: Arc<ProviderRegistry>,
    states: Arc<StateTokens>,
    store: SessionAdapter,
}

impl Orchestrator {
    /// Creates an orchestrator over the given providers and state generator.
    #[must_use]
    pub fn new(providers: Arc<ProviderRegistry>, states: Arc<StateTokens>) -> Self {
        Self {
            providers,
            states,
            store: SessionAdapter,
        }
    }

    /// Returns the provider registry.
    #[must_use]
    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Starts a flow and returns the provider's authorization URL.
    ///
    /// The `state` request parameter is used as the state token when present;
    /// otherwise a fresh nonce is generated. The provider's session blob is
    /// stored before returning, replacing any earlier flow for this provider.
    #[instrument(skip(self, session, params))]
    pub async fn begin_auth(
        &self,
        session: &Session,
        provider: &str,
        params: &CallbackParams,
    ) -> Result<String, FlowError> {
        let provider = self.providers.get(provider)?;
        let name = provider.name();

        let state = self.states.issue(params.state());
        let provider_session = provider.begin_auth(&state)?;
        let auth_url = provider_session.auth_url().to_string();

        let blob = provider_session.marshal()?;
        self.store.store(session, name, blob.as_bytes()).await?;

        debug!(provider = %name, "began authentication");
        Ok(auth_url)
    }

    /// Completes a flow and returns the authenticated user's profile.
    ///
    /// The stored blob is removed as soon as it has been read, whatever the
    /// outcome. If the profile cannot be fetched with the stored tokens, the
    /// request parameters are exchanged for new tokens once, the refreshed
    /// blob is stored, and the fetch is retried once.
    #[instrument(skip(self, session, params))]
    pub async fn complete_auth(
        &self,
        session: &Session,
        provider: &str,
        params: &CallbackParams,
    ) -> Result<UserProfile, FlowError> {
        let provider = self.providers.get(provider)?;
        let name = provider.name();

        let blob = self.take(session, name).await?;
        let blob = String::from_utf8(blob).map_err(|_| FlowError::NoSession {
            provider: name.clone(),
        })?;

        let mut provider_session = provider.unmarshal_session(&blob)?;
        validate_state(name, provider_session.auth_url(), params)?;

        match provider.fetch_user(&*provider_session).await {
            Ok(user) => return Ok(user),
            Err(e) => {
                debug!(provider = %name, error = %e, "existing tokens rejected, authorizing");
            }
        }

        provider_session.authorize(params).await?;

        let blob = provider_session.marshal()?;
        self.store.store(session, name, blob.as_bytes()).await?;

        provider.fetch_user(&*provider_session).await
    }

    /// Removes the stored blob for the provider.
    #[instrument(skip(self, session))]
    pub async fn logout(&self, session: &Session, provider: &str) -> Result<(), FlowError> {
        let provider = self.providers.get(provider)?;
        self.store.remove(session, provider.name()).await
    }

    /// Loads the provider's blob and removes it from the store.
    ///
    /// The removal happens even when the load fails, so a corrupt entry does
    /// not outlive the request that found it.
    async fn take(
        &self,
        session: &Session,
        name: &ProviderName,
    ) -> Result<Vec<u8>, FlowError> {
        let loaded = self.store.load(session, name).await;
        if let Err(e) = self.store.remove(session, name).await {
            tracing::warn!(provider = %name, error = %e, "failed to clear provider session");
        }
        loaded
    }
}

/// Resolves the provider name from a route's path parameters.
pub fn provider_from_path<'a>(
    params: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<&'a str, FlowError> {
    params
        .into_iter()
        .find(|(key, _)| *key == "provider")
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| FlowError::NoProviderSelected.into())
}
