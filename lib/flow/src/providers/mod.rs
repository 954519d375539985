//! Concrete provider implementations.

pub mod oauth;

pub use oauth::{OAuth2Config, OAuth2Provider, OAuth2Session, ProviderSetupError};
