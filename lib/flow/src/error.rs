//! Error types for the OAuth login flow.
//!
//! Errors are designed for layered context using rootcause: flow operations
//! return `Report<FlowError>` and callers read the variant back with
//! `Report::current_context`.

use gatehouse_core::ProviderName;
use std::fmt;

/// Errors from the login flow.
///
/// None of these are fatal to the process. The gateway logs them and ends
/// the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// No provider is registered under the requested name.
    ProviderNotFound { provider: String },
    /// The request did not name a provider.
    NoProviderSelected,
    /// The callback's state token differs from the one issued at begin-auth.
    StateMismatch { expected: String, received: String },
    /// The provider rejected a request or could not be reached.
    Upstream { provider: ProviderName, details: String },
    /// No usable session blob is stored for the provider.
    NoSession { provider: ProviderName },
    /// The session store failed to read or write.
    Session { details: String },
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderNotFound { provider } => {
                write!(f, "no provider registered as '{provider}'")
            }
            Self::NoProviderSelected => write!(f, "you must select a provider"),
            Self::StateMismatch { .. } => write!(f, "state token mismatch"),
            Self::Upstream { provider, details } => {
                write!(f, "provider '{provider}' error: {details}")
            }
            Self::NoSession { provider } => {
                write!(
                    f,
                    "could not find a matching '{provider}' session for this request"
                )
            }
            Self::Session { details } => write!(f, "session store error: {details}"),
        }
    }
}

impl std::error::Error for FlowError {}

impl FlowError {
    /// Shorthand for an upstream failure with a displayable cause.
    pub fn upstream(provider: &ProviderName, details: impl fmt::Display) -> Self {
        Self::Upstream {
            provider: provider.clone(),
            details: details.to_string(),
        }
    }
}
