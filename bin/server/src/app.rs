//! Application router: gateway routes, pages and the session layer.

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Router, middleware};
use gatehouse_access::{AccessLevel, AccessPolicy};
use gatehouse_flow::{Orchestrator, ProviderRegistry, StateTokens};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};
use tracing::warn;

use crate::config::ServerConfig;
use crate::gateway::{AccessGateway, Gateway, ProviderRoutes, identity, require_access};

/// Builds the application router.
pub fn build_app(
    config: &ServerConfig,
    providers: ProviderRegistry,
    states: StateTokens,
) -> Router {
    let policy = Arc::new(AccessPolicy::new(config.users.clone()));
    let orchestrator = Arc::new(Orchestrator::new(Arc::new(providers), Arc::new(states)));
    let hooks = Arc::new(AccessGateway::new(
        policy.clone(),
        config.pages.success_page.as_str(),
        config.pages.denied_page.as_str(),
    ));

    let gateway = Gateway::new(orchestrator, policy, hooks)
        .with_prefix(&config.auth_prefix)
        .with_default_provider(config.default_provider.clone());

    let admin_guard = gateway.guard([AccessLevel::Admin], &config.pages.denied_page);
    let admin = Router::new()
        .route("/admin", get(admin_page))
        .route_layer(middleware::from_fn_with_state(admin_guard, require_access));

    let mut pages = Router::new()
        .route("/", get(home_page))
        .with_state(gateway.clone())
        .merge(admin);
    let denied = config.pages.denied_page.as_str();
    if denied.starts_with('/') {
        if is_reserved_path(denied, gateway.prefix()) {
            warn!(path = denied, "denied page overlaps an existing route, not serving it");
        } else {
            pages = pages.route(denied, get(denied_page));
        }
    }

    let sessions = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.session.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.session.inactivity_minutes,
        )));

    pages
        .merge(gateway.router())
        .layer(sessions)
        .layer(TraceLayer::new_for_http())
}

/// Paths routed by the pages above or by the gateway itself.
fn is_reserved_path(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    path == "/"
        || path == "/admin"
        || path == format!("{prefix}/login")
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/') && rest.matches('/').count() == 2)
}

async fn home_page(State(gateway): State<Gateway>, session: Session) -> Html<String> {
    let prefix = gateway.prefix();
    let body = match identity::current_email(&session).await.ok().flatten() {
        Some(email) => {
            let email = html_escape::encode_text(&email);
            let level = gateway.access_for(&session).await;
            let logout = gateway
                .default_provider()
                .map(|provider| ProviderRoutes::under(prefix, provider).logout)
                .unwrap_or_default();
            format!(
                "<p>Signed in as {email} ({level}).</p>\
                 <p><a href=\"/admin\">Admin</a> | <a href=\"{logout}\">Sign out</a></p>"
            )
        }
        None => format!("<p><a href=\"{prefix}/login\">Sign in</a></p>"),
    };
    Html(body)
}

async fn admin_page(session: Session) -> Html<String> {
    let email = identity::current_email(&session)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    let email = html_escape::encode_text(&email);
    Html(format!("<h1>Admin</h1><p>Welcome, {email}.</p>"))
}

async fn denied_page() -> Html<&'static str> {
    Html("<h1>Access denied</h1><p>Your account has not been granted access.</p>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use gatehouse_access::UserRecord;
    use gatehouse_flow::testing::StaticProvider;
    use tower::ServiceExt;
    use url::Url;

    fn app_for(email: &str) -> Router {
        let mut config = ServerConfig::load(None).expect("defaults");
        config.users = vec![UserRecord::new("alice@example.com", AccessLevel::Admin)];
        app_with(config, email)
    }

    fn app_with(config: ServerConfig, email: &str) -> Router {
        let registry =
            ProviderRegistry::new().with(Arc::new(StaticProvider::new("google", email)));
        build_app(&config, registry, StateTokens::from_seed(9))
    }

    async fn get_with(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        app.clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .expect("location header")
            .to_str()
            .unwrap()
    }

    fn session_cookie(response: &Response) -> Option<String> {
        let value = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
        value.split(';').next().map(str::to_string)
    }

    async fn body_text(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8_lossy(&body).into_owned()
    }

    /// Signs in through the gateway and returns the resulting session cookie.
    async fn sign_in(app: &Router) -> String {
        let login = get_with(app, "/auth/google/login", None).await;
        let cookie = session_cookie(&login).expect("session cookie");
        let state = Url::parse(location(&login))
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .expect("state parameter");

        let callback = get_with(
            app,
            &format!("/auth/google/callback?state={state}&code=abc"),
            Some(&cookie),
        )
        .await;
        assert_eq!(callback.status(), StatusCode::TEMPORARY_REDIRECT);
        session_cookie(&callback).unwrap_or(cookie)
    }

    #[tokio::test]
    async fn admin_reaches_guarded_route() {
        let app = app_for("alice@example.com");
        let cookie = sign_in(&app).await;

        let response = get_with(&app, "/admin", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unlisted_email_is_sent_to_denied_page() {
        let app = app_for("eve@example.com");
        let cookie = sign_in(&app).await;

        let response = get_with(&app, "/admin", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/auth-denied");

        let response = get_with(&app, "/auth-denied", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn anonymous_home_links_to_login() {
        let app = app_for("alice@example.com");
        let response = get_with(&app, "/", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        assert!(body_text(response).await.contains("/auth/login"));
    }

    #[tokio::test]
    async fn pages_escape_email() {
        let mut config = ServerConfig::load(None).expect("defaults");
        config.users = vec![UserRecord::new("<b>@example.com", AccessLevel::Admin)];
        let app = app_with(config, "<b>@example.com");
        let cookie = sign_in(&app).await;

        let response = get_with(&app, "/admin", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("&lt;b&gt;@example.com"));
        assert!(!body.contains("<b>"));

        let body = body_text(get_with(&app, "/", Some(&cookie)).await).await;
        assert!(body.contains("&lt;b&gt;@example.com"));
        assert!(!body.contains("<b>"));
    }

    #[tokio::test]
    async fn denied_page_on_existing_route_is_not_served() {
        let mut config = ServerConfig::load(None).expect("defaults");
        config.users = vec![UserRecord::new("alice@example.com", AccessLevel::Admin)];
        config.pages.denied_page = "/admin".to_string();
        let app = app_with(config, "eve@example.com");

        let response = get_with(&app, "/admin", None).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/admin");
    }

    #[test]
    fn reserved_paths_cover_gateway_routes() {
        assert!(is_reserved_path("/", "/auth/"));
        assert!(is_reserved_path("/admin", "/auth/"));
        assert!(is_reserved_path("/auth/login", "/auth/"));
        assert!(is_reserved_path("/auth/google/callback", "/auth"));
        assert!(!is_reserved_path("/auth-denied", "/auth/"));
        assert!(!is_reserved_path("/auth/denied", "/auth/"));
    }

    #[tokio::test]
    async fn logout_closes_guarded_route() {
        let app = app_for("alice@example.com");
        let cookie = sign_in(&app).await;

        let response = get_with(&app, "/auth/google/logout", Some(&cookie)).await;
        assert_eq!(location(&response), "/");

        let response = get_with(&app, "/admin", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    }
}
