//! Login, callback and logout handlers.
//!
//! Flow failures end the request: login answers 400, callback answers an
//! empty 200, and logout redirects regardless.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use gatehouse_flow::{CallbackParams, provider_from_path};
use std::collections::HashMap;
use tower_sessions::Session;
use tracing::{debug, warn};

use super::Gateway;

/// Completes a flow from an existing session if possible, otherwise begins
/// a fresh one by redirecting to the provider.
pub(super) async fn login(
    gateway: &Gateway,
    session: &Session,
    provider: &str,
    params: CallbackParams,
) -> Response {
    match gateway
        .orchestrator
        .complete_auth(session, provider, &params)
        .await
    {
        Ok(user) => {
            let target = gateway
                .hooks
                .on_login(session, &user.provider, &user.email)
                .await;
            return Redirect::temporary(&target).into_response();
        }
        Err(e) => debug!(provider, reason = %e, "no reusable session, beginning authentication"),
    }

    match gateway
        .orchestrator
        .begin_auth(session, provider, &params)
        .await
    {
        Ok(auth_url) => Redirect::temporary(&auth_url).into_response(),
        Err(e) => {
            warn!(provider, error = %e, "failed to begin authentication");
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

/// Completes the flow the provider redirected back from.
pub(super) async fn callback(
    gateway: &Gateway,
    session: &Session,
    provider: &str,
    params: CallbackParams,
) -> Response {
    match gateway
        .orchestrator
        .complete_auth(session, provider, &params)
        .await
    {
        Ok(user) => {
            let target = gateway
                .hooks
                .on_login(session, &user.provider, &user.email)
                .await;
            Redirect::temporary(&target).into_response()
        }
        Err(e) => {
            warn!(provider, error = %e, "failed to complete authentication");
            ().into_response()
        }
    }
}

/// Removes the provider's session and redirects to the logout hook's URL.
pub(super) async fn logout(gateway: &Gateway, session: &Session, provider: &str) -> Response {
    if let Err(e) = gateway.orchestrator.logout(session, provider).await {
        warn!(provider, error = %e, "failed to remove provider session");
    }

    let target = gateway.hooks.on_logout(session).await;
    Redirect::temporary(&target).into_response()
}

/// `GET {prefix}/{provider}/login`
pub(super) async fn login_route(
    State(gateway): State<Gateway>,
    session: Session,
    Path(path): Path<HashMap<String, String>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    match provider_from_path(path.iter().map(|(k, v)| (k.as_str(), v.as_str()))) {
        Ok(provider) => login(&gateway, &session, provider, query.into()).await,
        Err(e) => {
            warn!(error = %e, "login without provider");
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

/// `GET {prefix}/{provider}/callback`
pub(super) async fn callback_route(
    State(gateway): State<Gateway>,
    session: Session,
    Path(path): Path<HashMap<String, String>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    match provider_from_path(path.iter().map(|(k, v)| (k.as_str(), v.as_str()))) {
        Ok(provider) => callback(&gateway, &session, provider, query.into()).await,
        Err(e) => {
            warn!(error = %e, "callback without provider");
            ().into_response()
        }
    }
}

/// `GET {prefix}/{provider}/logout`
pub(super) async fn logout_route(
    State(gateway): State<Gateway>,
    session: Session,
    Path(path): Path<HashMap<String, String>>,
) -> Response {
    match provider_from_path(path.iter().map(|(k, v)| (k.as_str(), v.as_str()))) {
        Ok(provider) => logout(&gateway, &session, provider).await,
        Err(e) => {
            warn!(error = %e, "logout without provider");
            let target = gateway.hooks.on_logout(&session).await;
            Redirect::temporary(&target).into_response()
        }
    }
}
