//! Route guard backed by the access policy.
//!
//! ```ignore
//! let guard = AccessGuard::new(policy, [AccessLevel::Admin], "/auth-denied");
//! let router = Router::new()
//!     .route("/admin", get(admin))
//!     .route_layer(middleware::from_fn_with_state(guard, require_access));
//! ```

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use gatehouse_access::{AccessLevel, AccessPolicy};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::{debug, warn};

use super::identity;

/// Levels admitted by a guarded route and where everyone else goes.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    policy: Arc<AccessPolicy>,
    allowed: Arc<[AccessLevel]>,
    denied_page: Arc<str>,
}

impl AccessGuard {
    #[must_use]
    pub fn new(
        policy: Arc<AccessPolicy>,
        allowed: impl IntoIterator<Item = AccessLevel>,
        denied_page: &str,
    ) -> Self {
        Self {
            policy,
            allowed: allowed.into_iter().collect(),
            denied_page: Arc::from(denied_page),
        }
    }

    /// Returns true if the session's user may pass.
    pub async fn admits(&self, session: &Session) -> bool {
        let email = identity::current_email(session).await.unwrap_or_else(|e| {
            warn!(error = %e, "failed to read authenticated email");
            None
        });
        self.policy.check(email.as_deref(), &self.allowed)
    }
}

/// Calls through when the caller's level is admitted, otherwise redirects
/// (307) to the denied page.
pub async fn require_access(
    State(guard): State<AccessGuard>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    if guard.admits(&session).await {
        return next.run(request).await;
    }

    debug!(path = %request.uri().path(), "access denied");
    Redirect::temporary(&guard.denied_page).into_response()
}
