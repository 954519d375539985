//! HTTP gateway over the login flow.
//!
//! This module provides:
//! - Login, callback and logout routes per provider
//! - The `LoginHooks` seam deciding where users land afterwards
//! - A guard middleware that redirects callers without the required level
//!
//! # Routes
//!
//! [`Gateway::router`] serves every registered provider from one set of
//! parameterized routes:
//!
//! | Route | Behavior |
//! |-------|----------|
//! | `GET {prefix}/{provider}/login` | reuse a stored session, else redirect (307) to the provider |
//! | `GET {prefix}/{provider}/callback` | complete the flow and redirect to the login hook's URL |
//! | `GET {prefix}/{provider}/logout` | drop the provider session and redirect to the logout hook's URL |
//! | `GET {prefix}/login` | redirect to the default provider's login route |
//!
//! [`Gateway::register`] adds the same three handlers for a single provider
//! on caller-chosen paths.

pub mod guard;
pub mod hooks;
pub mod identity;
mod routes;

pub use guard::{AccessGuard, require_access};
pub use hooks::{AccessGateway, LoginHooks};

use axum::Router;
use axum::extract::Query;
use axum::response::Redirect;
use axum::routing::get;
use gatehouse_access::{AccessLevel, AccessPolicy};
use gatehouse_core::ProviderName;
use gatehouse_flow::Orchestrator;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tower_sessions::Session;
use tracing::warn;

/// Paths of the three routes for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRoutes {
    pub login: String,
    pub callback: String,
    pub logout: String,
}

impl ProviderRoutes {
    /// The conventional `{prefix}/{provider}/{action}` paths.
    #[must_use]
    pub fn under(prefix: &str, provider: &ProviderName) -> Self {
        Self::with_segment(prefix, provider.as_str())
    }

    fn with_segment(prefix: &str, segment: &str) -> Self {
        let base = format!("{}/{segment}", prefix.trim_end_matches('/'));
        Self {
            login: format!("{base}/login"),
            callback: format!("{base}/callback"),
            logout: format!("{base}/logout"),
        }
    }
}

/// Shared state of the gateway routes.
#[derive(Clone)]
pub struct Gateway {
    orchestrator: Arc<Orchestrator>,
    policy: Arc<AccessPolicy>,
    hooks: Arc<dyn LoginHooks>,
    prefix: String,
    default_provider: Option<ProviderName>,
}

impl Gateway {
    /// Creates a gateway with routes at the root and no default provider.
    #[must_use]
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        policy: Arc<AccessPolicy>,
        hooks: Arc<dyn LoginHooks>,
    ) -> Self {
        Self {
            orchestrator,
            policy,
            hooks,
            prefix: String::new(),
            default_provider: None,
        }
    }

    /// Serves the routes under `prefix`, e.g. `/auth`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    /// Returns the path prefix of the gateway routes.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the provider served by `{prefix}/login`, if any.
    #[must_use]
    pub fn default_provider(&self) -> Option<&ProviderName> {
        self.default_provider.as_ref()
    }

    /// Enables `{prefix}/login`, redirecting to `provider`'s login route.
    #[must_use]
    pub fn with_default_provider(mut self, provider: ProviderName) -> Self {
        if self.orchestrator.providers().get(provider.as_str()).is_err() {
            warn!(%provider, "default provider is not registered");
        }
        self.default_provider = Some(provider);
        self
    }

    /// Returns the routes for every registered provider.
    pub fn router(&self) -> Router {
        let paths = ProviderRoutes::with_segment(&self.prefix, "{provider}");
        let mut router = Router::new()
            .route(&paths.login, get(routes::login_route))
            .route(&paths.callback, get(routes::callback_route))
            .route(&paths.logout, get(routes::logout_route));

        if let Some(provider) = &self.default_provider {
            let target = ProviderRoutes::under(&self.prefix, provider).login;
            router = router.route(
                &format!("{}/login", self.prefix),
                get(move || std::future::ready(Redirect::temporary(&target))),
            );
        }

        router.with_state(self.clone())
    }

    /// Adds login, callback and logout routes for one provider at the given
    /// paths.
    pub fn register(
        &self,
        router: Router,
        provider: ProviderName,
        paths: &ProviderRoutes,
    ) -> Router {
        let login = {
            let gateway = self.clone();
            let provider = provider.clone();
            move |session: Session, Query(query): Query<HashMap<String, String>>| async move {
                routes::login(&gateway, &session, provider.as_str(), query.into()).await
            }
        };
        let callback = {
            let gateway = self.clone();
            let provider = provider.clone();
            move |session: Session, Query(query): Query<HashMap<String, String>>| async move {
                routes::callback(&gateway, &session, provider.as_str(), query.into()).await
            }
        };
        let logout = {
            let gateway = self.clone();
            move |session: Session| async move {
                routes::logout(&gateway, &session, provider.as_str()).await
            }
        };

        router
            .route(&paths.login, get(login))
            .route(&paths.callback, get(callback))
            .route(&paths.logout, get(logout))
    }

    /// Returns the access level of the session's authenticated user.
    pub async fn access_for(&self, session: &Session) -> AccessLevel {
        match identity::current_email(session).await {
            Ok(Some(email)) => self.policy.level_for(&email),
            Ok(None) => AccessLevel::None,
            Err(e) => {
                warn!(error = %e, "failed to read authenticated email");
                AccessLevel::None
            }
        }
    }

    /// Creates a guard admitting `allowed` and redirecting others to
    /// `denied_page`.
    #[must_use]
    pub fn guard(
        &self,
        allowed: impl IntoIterator<Item = AccessLevel>,
        denied_page: &str,
    ) -> AccessGuard {
        AccessGuard::new(self.policy.clone(), allowed, denied_page)
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("orchestrator", &self.orchestrator)
            .field("prefix", &self.prefix)
            .field("default_provider", &self.default_provider)
            .finish_non_exhaustive()
    }
}
