//! Authorization-code OAuth 2.0 provider built on the `oauth2` crate.
//!
//! The flow uses PKCE (S256). The verifier is kept inside the session blob so
//! the callback can complete the exchange without any server-side state
//! beyond the browser session. Profiles come from the provider's userinfo
//! endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatehouse_core::{ProviderName, Result};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::error::FlowError;
use crate::provider::{CallbackParams, Provider, ProviderSession, UserProfile};

/// Google OAuth authorization URL.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth token URL.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Google OpenID Connect userinfo URL.
pub const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Endpoints and credentials for an authorization-code provider.
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    /// Where the provider sends the browser back to.
    pub redirect_url: String,
    pub scopes: Vec<String>,
    /// Userinfo JSON field holding the email address.
    pub email_field: String,
    /// Extra query parameters added to the authorization URL.
    pub extra_params: Vec<(String, String)>,
}

impl OAuth2Config {
    /// Google endpoints with the `openid email profile` scopes and offline
    /// access, so a refresh token is issued.
    #[must_use]
    pub fn google(client_id: String, client_secret: String, redirect_url: String) -> Self {
        Self {
            client_id,
            client_secret,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            redirect_url,
            scopes: vec![
                "openid".to_string(),
                "email".to_string(),
                "profile".to_string(),
            ],
            email_field: "email".to_string(),
            extra_params: vec![("access_type".to_string(), "offline".to_string())],
        }
    }
}

/// Errors from building a provider out of its configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSetupError {
    /// A configured URL could not be parsed.
    InvalidUrl { field: &'static str, details: String },
    /// The HTTP client could not be created.
    HttpClient { details: String },
}

impl fmt::Display for ProviderSetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl { field, details } => write!(f, "invalid {field}: {details}"),
            Self::HttpClient { details } => {
                write!(f, "failed to create HTTP client: {details}")
            }
        }
    }
}

impl std::error::Error for ProviderSetupError {}

/// Validated endpoints shared by the provider and all of its sessions.
struct Endpoints {
    name: ProviderName,
    client_id: ClientId,
    client_secret: ClientSecret,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    redirect_url: RedirectUrl,
    userinfo_url: Url,
    scopes: Vec<String>,
    email_field: String,
    extra_params: Vec<(String, String)>,
    http: reqwest::Client,
}

/// Authorization-code provider with PKCE.
#[derive(Clone)]
pub struct OAuth2Provider {
    endpoints: Arc<Endpoints>,
}

impl OAuth2Provider {
    /// Creates a provider registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL in the configuration is invalid.
    pub fn new(name: ProviderName, config: OAuth2Config) -> Result<Self, ProviderSetupError> {
        let invalid = |field: &'static str| {
            move |e: url::ParseError| ProviderSetupError::InvalidUrl {
                field,
                details: e.to_string(),
            }
        };

        let auth_url = AuthUrl::new(config.auth_url).map_err(invalid("auth URL"))?;
        let token_url = TokenUrl::new(config.token_url).map_err(invalid("token URL"))?;
        let redirect_url =
            RedirectUrl::new(config.redirect_url).map_err(invalid("redirect URL"))?;
        let userinfo_url = Url::parse(&config.userinfo_url).map_err(invalid("userinfo URL"))?;

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProviderSetupError::HttpClient {
                details: e.to_string(),
            })?;

        Ok(Self {
            endpoints: Arc::new(Endpoints {
                name,
                client_id: ClientId::new(config.client_id),
                client_secret: ClientSecret::new(config.client_secret),
                auth_url,
                token_url,
                redirect_url,
                userinfo_url,
                scopes: config.scopes,
                email_field: config.email_field,
                extra_params: config.extra_params,
                http,
            }),
        })
    }
}

impl fmt::Debug for OAuth2Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Provider")
            .field("name", &self.endpoints.name)
            .field("auth_url", &self.endpoints.auth_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Serialized form of an [`OAuth2Session`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionData {
    auth_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pkce_verifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

/// Flow state for an [`OAuth2Provider`].
pub struct OAuth2Session {
    endpoints: Arc<Endpoints>,
    data: SessionData,
}

impl OAuth2Session {
    /// Returns when the access token expires, if the provider said.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.data.expires_at
    }
}

impl fmt::Debug for OAuth2Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Session")
            .field("provider", &self.endpoints.name)
            .field("authorized", &self.data.access_token.is_some())
            .field("expires_at", &self.data.expires_at)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProviderSession for OAuth2Session {
    fn auth_url(&self) -> &str {
        &self.data.auth_url
    }

    fn access_token(&self) -> Option<&str> {
        self.data.access_token.as_deref()
    }

    fn marshal(&self) -> Result<String, FlowError> {
        serde_json::to_string(&self.data).map_err(|e| {
            FlowError::Session {
                details: format!("failed to serialize '{}' session: {e}", self.endpoints.name),
            }
            .into()
        })
    }

    async fn authorize(&mut self, params: &CallbackParams) -> Result<(), FlowError> {
        let endpoints = self.endpoints.clone();
        let name = &endpoints.name;

        let client = BasicClient::new(endpoints.client_id.clone())
            .set_client_secret(endpoints.client_secret.clone())
            .set_token_uri(endpoints.token_url.clone())
            .set_redirect_uri(endpoints.redirect_url.clone());

        let response = if let Some(code) = params.code() {
            let mut request = client.exchange_code(AuthorizationCode::new(code.to_string()));
            if let Some(verifier) = self.data.pkce_verifier.take() {
                request = request.set_pkce_verifier(PkceCodeVerifier::new(verifier));
            }
            request
                .request_async(&endpoints.http)
                .await
                .map_err(|e| FlowError::upstream(name, format!("token exchange failed: {e}")))?
        } else if let Some(refresh_token) = self.data.refresh_token.clone() {
            let refresh_token = RefreshToken::new(refresh_token);
            client
                .exchange_refresh_token(&refresh_token)
                .request_async(&endpoints.http)
                .await
                .map_err(|e| FlowError::upstream(name, format!("token refresh failed: {e}")))?
        } else {
            return Err(FlowError::upstream(name, "missing authorization code").into());
        };

        self.data.access_token = Some(response.access_token().secret().clone());
        if let Some(refresh_token) = response.refresh_token() {
            self.data.refresh_token = Some(refresh_token.secret().clone());
        }
        self.data.expires_at = response
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| Utc::now() + d);

        debug!(provider = %name, "obtained access token");
        Ok(())
    }
}

#[async_trait]
impl Provider for OAuth2Provider {
    fn name(&self) -> &ProviderName {
        &self.endpoints.name
    }

    fn begin_auth(&self, state: &str) -> Result<Box<dyn ProviderSession>, FlowError> {
        let endpoints = &self.endpoints;

        let client = BasicClient::new(endpoints.client_id.clone())
            .set_client_secret(endpoints.client_secret.clone())
            .set_auth_uri(endpoints.auth_url.clone())
            .set_redirect_uri(endpoints.redirect_url.clone());

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let state = state.to_string();
        let mut request = client
            .authorize_url(move || CsrfToken::new(state))
            .set_pkce_challenge(pkce_challenge);

        for scope in &endpoints.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        for (key, value) in &endpoints.extra_params {
            request = request.add_extra_param(key.as_str(), value.as_str());
        }

        let (auth_url, _) = request.url();

        Ok(Box::new(OAuth2Session {
            endpoints: endpoints.clone(),
            data: SessionData {
                auth_url: auth_url.to_string(),
                pkce_verifier: Some(pkce_verifier.secret().clone()),
                ..SessionData::default()
            },
        }))
    }

    fn unmarshal_session(
        &self,
        data: &str,
    ) -> Result<Box<dyn ProviderSession>, FlowError> {
        let data: SessionData = serde_json::from_str(data).map_err(|e| {
            debug!(provider = %self.endpoints.name, error = %e, "stored session is malformed");
            FlowError::NoSession {
                provider: self.endpoints.name.clone(),
            }
        })?;

        Ok(Box::new(OAuth2Session {
            endpoints: self.endpoints.clone(),
            data,
        }))
    }

    async fn fetch_user(
        &self,
        session: &dyn ProviderSession,
    ) -> Result<UserProfile, FlowError> {
        let endpoints = &self.endpoints;
        let name = &endpoints.name;

        let access_token = session.access_token().ok_or_else(|| {
            FlowError::upstream(name, "cannot get user information without access token")
        })?;

        let response = endpoints
            .http
            .get(endpoints.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| FlowError::upstream(name, format!("userinfo request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(provider = %name, %status, body = %body, "userinfo request rejected");
            return Err(FlowError::upstream(
                name,
                format!("userinfo request returned {status}"),
            )
            .into());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FlowError::upstream(name, format!("invalid userinfo response: {e}")))?;

        let email = body
            .get(&endpoints.email_field)
            .and_then(serde_json::Value::as_str)
            .filter(|email| !email.is_empty())
            .ok_or_else(|| {
                FlowError::upstream(
                    name,
                    format!("userinfo response has no '{}' field", endpoints.email_field),
                )
            })?;

        let user_id = ["sub", "id"]
            .iter()
            .find_map(|key| body.get(*key))
            .and_then(|id| match id {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            });

        Ok(UserProfile {
            provider: name.clone(),
            email: email.to_string(),
            user_id,
            name: body
                .get("name")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn test_config(base: &str) -> OAuth2Config {
        OAuth2Config {
            client_id: "client-123".to_string(),
            client_secret: "secret-456".to_string(),
            auth_url: format!("{base}/authorize"),
            token_url: format!("{base}/token"),
            userinfo_url: format!("{base}/userinfo"),
            redirect_url: "https://app.example.com/auth/test/callback".to_string(),
            scopes: vec!["openid".to_string(), "email".to_string()],
            email_field: "email".to_string(),
            extra_params: vec![("prompt".to_string(), "consent".to_string())],
        }
    }

    fn test_provider(base: &str) -> OAuth2Provider {
        OAuth2Provider::new("test".parse().unwrap(), test_config(base)).expect("valid config")
    }

    fn query(url: &str, key: &str) -> Option<String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn google_config_uses_google_endpoints() {
        let config = OAuth2Config::google(
            "id".to_string(),
            "secret".to_string(),
            "https://app.example.com/auth/google/callback".to_string(),
        );
        assert_eq!(config.auth_url, GOOGLE_AUTH_URL);
        assert_eq!(config.token_url, GOOGLE_TOKEN_URL);
        assert!(config.scopes.contains(&"email".to_string()));

        OAuth2Provider::new("google".parse().unwrap(), config).expect("valid config");
    }

    #[test]
    fn invalid_redirect_url_is_rejected() {
        let mut config = test_config("https://provider.example.com");
        config.redirect_url = "not a url".to_string();

        let err = OAuth2Provider::new("test".parse().unwrap(), config).unwrap_err();
        assert!(matches!(
            err.current_context(),
            ProviderSetupError::InvalidUrl {
                field: "redirect URL",
                ..
            }
        ));
    }

    #[test]
    fn begin_auth_builds_pkce_authorization_url() {
        let provider = test_provider("https://provider.example.com");
        let session = provider.begin_auth("state-abc").unwrap();
        let url = session.auth_url();

        assert!(url.starts_with("https://provider.example.com/authorize?"));
        assert_eq!(query(url, "state").as_deref(), Some("state-abc"));
        assert_eq!(query(url, "client_id").as_deref(), Some("client-123"));
        assert_eq!(query(url, "response_type").as_deref(), Some("code"));
        assert_eq!(query(url, "code_challenge_method").as_deref(), Some("S256"));
        assert_eq!(query(url, "scope").as_deref(), Some("openid email"));
        assert_eq!(query(url, "prompt").as_deref(), Some("consent"));
        assert!(query(url, "code_challenge").is_some());
        assert!(session.access_token().is_none());
    }

    #[test]
    fn marshal_round_trip_keeps_auth_url() {
        let provider = test_provider("https://provider.example.com");
        let session = provider.begin_auth("state-abc").unwrap();

        let blob = session.marshal().unwrap();
        assert!(blob.contains("pkce_verifier"));

        let restored = provider.unmarshal_session(&blob).unwrap();
        assert_eq!(restored.auth_url(), session.auth_url());
    }

    #[test]
    fn unmarshal_garbage_is_no_session() {
        let provider = test_provider("https://provider.example.com");
        let err = provider.unmarshal_session("{not json").unwrap_err();
        assert!(matches!(err.current_context(), FlowError::NoSession { .. }));
    }

    #[tokio::test]
    async fn fetch_user_without_token_fails() {
        let provider = test_provider("https://provider.example.com");
        let session = provider.begin_auth("s").unwrap();

        let err = provider.fetch_user(&*session).await.unwrap_err();
        assert!(matches!(err.current_context(), FlowError::Upstream { .. }));
    }

    #[tokio::test]
    async fn authorize_without_code_or_refresh_token_fails() {
        let provider = test_provider("https://provider.example.com");
        let mut session = provider.begin_auth("s").unwrap();

        let err = session
            .authorize(&CallbackParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err.current_context(), FlowError::Upstream { .. }));
    }

    #[tokio::test]
    async fn authorize_exchanges_code_and_fetches_user() {
        let mut server = Server::new_async().await;
        let token = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                mockito::Matcher::UrlEncoded("code".into(), "auth-code".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"access_token":"access-1","token_type":"bearer",
                    "expires_in":3600,"refresh_token":"refresh-1"}"#,
            )
            .create_async()
            .await;
        let userinfo = server
            .mock("GET", "/userinfo")
            .match_header("authorization", "Bearer access-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sub":"1234","email":"alice@example.com","name":"Alice"}"#)
            .create_async()
            .await;

        let provider = test_provider(&server.url());
        let mut session = provider.begin_auth("s").unwrap();
        let params: CallbackParams = [("code", "auth-code"), ("state", "s")].into_iter().collect();

        session.authorize(&params).await.unwrap();
        assert_eq!(session.access_token(), Some("access-1"));

        let user = provider.fetch_user(&*session).await.unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.user_id.as_deref(), Some("1234"));
        assert_eq!(user.name.as_deref(), Some("Alice"));

        let blob = session.marshal().unwrap();
        assert!(blob.contains("refresh-1"));
        assert!(!blob.contains("pkce_verifier"));

        token.assert_async().await;
        userinfo.assert_async().await;
    }

    #[tokio::test]
    async fn authorize_refreshes_without_code() {
        let mut server = Server::new_async().await;
        let token = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::UrlEncoded(
                "grant_type".into(),
                "refresh_token".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"access-2","token_type":"bearer"}"#)
            .create_async()
            .await;

        let provider = test_provider(&server.url());
        let blob = r#"{"auth_url":"https://provider.example.com/authorize?state=s",
                       "refresh_token":"refresh-1"}"#;
        let mut session = provider.unmarshal_session(blob).unwrap();

        session.authorize(&CallbackParams::new()).await.unwrap();
        assert_eq!(session.access_token(), Some("access-2"));
        // refresh token is kept when the provider does not rotate it
        assert!(session.marshal().unwrap().contains("refresh-1"));

        token.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_userinfo_is_upstream_error() {
        let mut server = Server::new_async().await;
        let _userinfo = server
            .mock("GET", "/userinfo")
            .with_status(401)
            .create_async()
            .await;

        let provider = test_provider(&server.url());
        let blob =
            r#"{"auth_url":"https://provider.example.com/authorize","access_token":"expired"}"#;
        let session = provider.unmarshal_session(blob).unwrap();

        let err = provider.fetch_user(&*session).await.unwrap_err();
        assert!(matches!(err.current_context(), FlowError::Upstream { .. }));
    }

    #[tokio::test]
    async fn userinfo_without_email_is_upstream_error() {
        let mut server = Server::new_async().await;
        let _userinfo = server
            .mock("GET", "/userinfo")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sub":"1234"}"#)
            .create_async()
            .await;

        let provider = test_provider(&server.url());
        let blob = r#"{"auth_url":"https://provider.example.com/authorize","access_token":"tok"}"#;
        let session = provider.unmarshal_session(blob).unwrap();

        let err = provider.fetch_user(&*session).await.unwrap_err();
        assert!(matches!(err.current_context(), FlowError::Upstream { .. }));
    }
}
