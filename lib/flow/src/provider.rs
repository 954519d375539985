//! Provider capability traits and the values that flow through them.
//!
//! A [`Provider`] is one external OAuth identity service. It starts flows,
//! restores in-flight flows from their stored form, and fetches the
//! authenticated user's profile. The per-flow state lives in a
//! [`ProviderSession`], which the provider defines and serializes however
//! it likes; the orchestrator only ever sees it through this trait.

use async_trait::async_trait;
use gatehouse_core::{ProviderName, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::FlowError;

/// Query parameters of a login or callback request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams(HashMap<String, String>);

impl CallbackParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a parameter value. Empty values are treated as absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Returns the `state` parameter.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.get("state")
    }

    /// Returns the authorization `code` parameter.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.get("code")
    }
}

impl From<HashMap<String, String>> for CallbackParams {
    fn from(params: HashMap<String, String>) -> Self {
        Self(params)
    }
}

impl<K, V> FromIterator<(K, V)> for CallbackParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Profile of the user who completed a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Provider that authenticated the user.
    pub provider: ProviderName,
    /// Email address reported by the provider.
    pub email: String,
    /// Provider's identifier for the user, if reported.
    pub user_id: Option<String>,
    /// Display name, if reported.
    pub name: Option<String>,
}

/// In-flight or completed OAuth state for one provider in one browser session.
#[async_trait]
pub trait ProviderSession: Send + Sync + fmt::Debug {
    /// Authorization URL issued when the flow began, including its `state`.
    fn auth_url(&self) -> &str;

    /// Access token, once the authorization code has been exchanged.
    fn access_token(&self) -> Option<&str>;

    /// Serializes the session for storage.
    fn marshal(&self) -> Result<String, FlowError>;

    /// Exchanges callback parameters for tokens, updating this session.
    async fn authorize(&mut self, params: &CallbackParams) -> Result<(), FlowError>;
}

/// An external OAuth identity service.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name the provider is registered and routed under.
    fn name(&self) -> &ProviderName;

    /// Starts a flow whose authorization URL carries `state`.
    fn begin_auth(&self, state: &str) -> Result<Box<dyn ProviderSession>, FlowError>;

    /// Restores a session previously produced by [`ProviderSession::marshal`].
    fn unmarshal_session(&self, data: &str)
    -> Result<Box<dyn ProviderSession>, FlowError>;

    /// Fetches the profile of the user the session is authorized for.
    async fn fetch_user(
        &self,
        session: &dyn ProviderSession,
    ) -> Result<UserProfile, FlowError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_treat_empty_values_as_absent() {
        let params: CallbackParams = [("state", ""), ("code", "abc")].into_iter().collect();
        assert_eq!(params.state(), None);
        assert_eq!(params.code(), Some("abc"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn params_from_hash_map() {
        let mut map = HashMap::new();
        map.insert("state".to_string(), "xyz".to_string());
        let params = CallbackParams::from(map);
        assert_eq!(params.state(), Some("xyz"));
    }
}
