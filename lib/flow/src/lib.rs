//! OAuth login flow for gatehouse.
//!
//! This crate provides:
//! - The provider seam (`Provider`, `ProviderSession`) and a registry of
//!   named providers
//! - A generic authorization-code provider with PKCE (`providers::oauth`)
//! - Anti-CSRF state tokens
//! - Compressed per-provider blobs in the browser session (`SessionAdapter`)
//! - The begin-auth / complete-auth / logout orchestration (`Orchestrator`)
//!
//! The HTTP surface lives in the server crate; nothing here depends on a
//! particular web framework beyond `tower_sessions::Session`.

pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod state;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::FlowError;
pub use orchestrator::{Orchestrator, provider_from_path};
pub use provider::{CallbackParams, Provider, ProviderSession, UserProfile};
pub use registry::ProviderRegistry;
pub use state::StateTokens;
pub use store::SessionAdapter;
