//! Anti-CSRF state tokens.
//!
//! A state token is issued when a flow begins, travels to the provider inside
//! the authorization URL, and must come back unchanged on the callback.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use gatehouse_core::{ProviderName, Result};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::{Mutex, PoisonError};
use url::Url;

use crate::error::FlowError;
use crate::provider::CallbackParams;

/// Number of random bytes in a generated state token.
pub const STATE_NONCE_BYTES: usize = 64;

/// Process-wide generator of state tokens.
///
/// The generator is seeded once and shared by all requests; the mutex
/// serializes access so concurrent callers never observe torn state.
#[derive(Debug)]
pub struct StateTokens {
    rng: Mutex<StdRng>,
}

impl StateTokens {
    /// Creates a generator seeded from the operating system.
    #[must_use]
    pub fn from_os_rng() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Creates a deterministic generator. Only suitable for tests.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Returns the caller-supplied state if present, otherwise a fresh
    /// base64url-encoded nonce of [`STATE_NONCE_BYTES`] random bytes.
    pub fn issue(&self, requested: Option<&str>) -> String {
        match requested {
            Some(state) if !state.is_empty() => state.to_string(),
            _ => self.generate(),
        }
    }

    fn generate(&self) -> String {
        let mut nonce = [0u8; STATE_NONCE_BYTES];
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fill_bytes(&mut nonce);
        URL_SAFE.encode(nonce)
    }
}

impl Default for StateTokens {
    fn default() -> Self {
        Self::from_os_rng()
    }
}

/// Checks that the state embedded in the session's authorization URL matches
/// the `state` parameter of the current request.
///
/// An authorization URL without a state parameter has nothing to bind and is
/// accepted.
pub fn validate_state(
    provider: &ProviderName,
    auth_url: &str,
    params: &CallbackParams,
) -> Result<(), FlowError> {
    let auth_url = Url::parse(auth_url).map_err(|e| {
        tracing::debug!(provider = %provider, error = %e, "stored authorization URL is invalid");
        FlowError::NoSession {
            provider: provider.clone(),
        }
    })?;

    let original = auth_url
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();

    let received = params.state().unwrap_or_default();
    if !original.is_empty() && original != received {
        return Err(FlowError::StateMismatch {
            expected: original,
            received: received.to_string(),
        }
        .into());
    }

    Ok(())
}
