//! In-process provider for tests.
//!
//! `StaticProvider` issues authorization URLs on a fixed endpoint, accepts any
//! non-empty authorization code, and reports a fixed email once authorized.

use async_trait::async_trait;
use gatehouse_core::{ProviderName, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

use crate::error::FlowError;
use crate::provider::{CallbackParams, Provider, ProviderSession, UserProfile};

/// Counts profile fetches made through a [`StaticProvider`].
#[derive(Debug, Clone, Default)]
pub struct FetchCounter(Arc<AtomicUsize>);

impl FetchCounter {
    /// Returns the number of fetches so far.
    #[must_use]
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Deterministic provider that never leaves the process.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    name: ProviderName,
    email: String,
    reject_begin: bool,
    fetches: FetchCounter,
}

impl StaticProvider {
    /// Authorization endpoint used in issued URLs.
    pub const AUTH_ENDPOINT: &'static str = "https://provider.test/authorize";

    /// Creates a provider that authenticates every user as `email`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a valid provider name.
    #[must_use]
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            name: name.parse().expect("valid provider name"),
            email: email.to_string(),
            reject_begin: false,
            fetches: FetchCounter::default(),
        }
    }

    /// Makes `begin_auth` fail as if the provider were unreachable.
    #[must_use]
    pub fn rejecting_begin(mut self) -> Self {
        self.reject_begin = true;
        self
    }

    /// Returns a handle on the profile fetch counter.
    #[must_use]
    pub fn fetch_counter(&self) -> FetchCounter {
        self.fetches.clone()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StaticSession {
    provider: ProviderName,
    auth_url: String,
    access_token: Option<String>,
}

#[async_trait]
impl ProviderSession for StaticSession {
    fn auth_url(&self) -> &str {
        &self.auth_url
    }

    fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    fn marshal(&self) -> Result<String, FlowError> {
        serde_json::to_string(self).map_err(|e| {
            FlowError::Session {
                details: e.to_string(),
            }
            .into()
        })
    }

    async fn authorize(&mut self, params: &CallbackParams) -> Result<(), FlowError> {
        let code = params
            .code()
            .ok_or_else(|| FlowError::upstream(&self.provider, "missing authorization code"))?;
        self.access_token = Some(format!("token-{code}"));
        Ok(())
    }
}

#[async_trait]
impl Provider for StaticProvider {
    fn name(&self) -> &ProviderName {
        &self.name
    }

    fn begin_auth(&self, state: &str) -> Result<Box<dyn ProviderSession>, FlowError> {
        if self.reject_begin {
            return Err(FlowError::upstream(&self.name, "provider unavailable").into());
        }

        let auth_url = Url::parse_with_params(
            Self::AUTH_ENDPOINT,
            &[("client_id", "test-client"), ("state", state)],
        )
        .map_err(|e| FlowError::upstream(&self.name, e))?;

        Ok(Box::new(StaticSession {
            provider: self.name.clone(),
            auth_url: auth_url.to_string(),
            access_token: None,
        }))
    }

    fn unmarshal_session(
        &self,
        data: &str,
    ) -> Result<Box<dyn ProviderSession>, FlowError> {
        let session: StaticSession =
            serde_json::from_str(data).map_err(|_| FlowError::NoSession {
                provider: self.name.clone(),
            })?;
        Ok(Box::new(session))
    }

    async fn fetch_user(
        &self,
        session: &dyn ProviderSession,
    ) -> Result<UserProfile, FlowError> {
        self.fetches.increment();

        let token = session.access_token().ok_or_else(|| {
            FlowError::upstream(
                &self.name,
                "cannot get user information without access token",
            )
        })?;

        Ok(UserProfile {
            provider: self.name.clone(),
            email: self.email.clone(),
            user_id: Some(token.to_string()),
            name: None,
        })
    }
}
