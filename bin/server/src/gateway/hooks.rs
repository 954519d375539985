//! What happens after a user logs in or out.

use async_trait::async_trait;
use gatehouse_access::{AccessLevel, AccessPolicy};
use gatehouse_core::ProviderName;
use std::sync::Arc;
use tower_sessions::Session;
use tracing::{debug, error, info};

use super::identity;

/// Decides where the browser goes after login and logout.
///
/// Both methods return the URL the gateway redirects to.
#[async_trait]
pub trait LoginHooks: Send + Sync {
    /// Called once `email` has been authenticated by `provider`.
    async fn on_login(&self, session: &Session, provider: &ProviderName, email: &str) -> String;

    /// Called after the provider's stored session has been removed.
    async fn on_logout(&self, session: &Session) -> String;
}

/// Admits users whose email has an access level in the policy.
///
/// Users without a level are sent to the denied page and nothing is stored.
/// Everyone else has their email stored in the session and is sent to the
/// success page.
#[derive(Debug, Clone)]
pub struct AccessGateway {
    policy: Arc<AccessPolicy>,
    success_page: String,
    denied_page: String,
}

impl AccessGateway {
    #[must_use]
    pub fn new(
        policy: Arc<AccessPolicy>,
        success_page: impl Into<String>,
        denied_page: impl Into<String>,
    ) -> Self {
        Self {
            policy,
            success_page: success_page.into(),
            denied_page: denied_page.into(),
        }
    }
}

#[async_trait]
impl LoginHooks for AccessGateway {
    async fn on_login(&self, session: &Session, provider: &ProviderName, email: &str) -> String {
        let level = self.policy.level_for(email);
        if level == AccessLevel::None {
            debug!(%provider, email, "user has no access level");
            return self.denied_page.clone();
        }

        // A session opened before login must not become the logged-in one.
        if let Err(e) = session.cycle_id().await {
            error!(%provider, email, error = %e, "failed to rotate session id");
            return self.denied_page.clone();
        }

        if let Err(e) = identity::remember_email(session, email).await {
            error!(%provider, email, error = %e, "failed to store authenticated email");
            return self.denied_page.clone();
        }

        info!(%provider, email, %level, "user logged in");
        self.success_page.clone()
    }

    async fn on_logout(&self, session: &Session) -> String {
        if let Err(e) = identity::forget_email(session).await {
            error!(error = %e, "failed to clear authenticated email");
        }
        self.success_page.clone()
    }
}
