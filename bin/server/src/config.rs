//! Centralized server configuration.
//!
//! Configuration is loaded via the `config` crate from an optional YAML file
//! overlaid by environment variables prefixed with `GATEHOUSE_`. Nested keys
//! use `__` as separator, e.g. `GATEHOUSE_OAUTH__KEY`.

use gatehouse_access::UserRecord;
use gatehouse_core::ProviderName;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "GATEHOUSE_CONFIG";

/// Configuration file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "gatehouse.yaml";

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Path prefix for the login, callback and logout routes.
    #[serde(default = "default_auth_prefix")]
    pub auth_prefix: String,

    /// Provider used by `{auth_prefix}/login`.
    #[serde(default = "default_provider")]
    pub default_provider: ProviderName,

    /// OAuth client credentials.
    #[serde(default)]
    pub oauth: OAuthConfig,

    /// Session cookie configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// Redirect targets after login and logout.
    #[serde(default)]
    pub pages: PageConfig,

    /// Static allow-list of users and their access levels.
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

/// OAuth client credentials shared by the configured providers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthConfig {
    /// OAuth client ID.
    #[serde(default)]
    pub key: String,

    /// OAuth client secret.
    #[serde(default)]
    pub secret: String,

    /// Base URL for callbacks; each provider's redirect URL is
    /// `{callback}/{provider}/callback`.
    #[serde(default = "default_callback")]
    pub callback: String,
}

impl OAuthConfig {
    /// Returns the redirect URL registered with `provider`.
    #[must_use]
    pub fn redirect_for(&self, provider: &ProviderName) -> String {
        format!("{}/{provider}/callback", self.callback.trim_end_matches('/'))
    }
}

/// Session-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Minutes of inactivity after which the session expires.
    #[serde(default = "default_inactivity_minutes")]
    pub inactivity_minutes: i64,
}

/// Pages the login hooks redirect to.
#[derive(Debug, Clone, Deserialize)]
pub struct PageConfig {
    #[serde(default = "default_success_page")]
    pub success_page: String,

    #[serde(default = "default_denied_page")]
    pub denied_page: String,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_auth_prefix() -> String {
    "/auth".to_string()
}

fn default_provider() -> ProviderName {
    ProviderName::google()
}

fn default_callback() -> String {
    "http://127.0.0.1:3000/auth".to_string()
}

fn default_secure_cookies() -> bool {
    true
}

fn default_inactivity_minutes() -> i64 {
    60
}

fn default_success_page() -> String {
    "/".to_string()
}

fn default_denied_page() -> String {
    "/auth-denied".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secure_cookies: default_secure_cookies(),
            inactivity_minutes: default_inactivity_minutes(),
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            success_page: default_success_page(),
            denied_page: default_denied_page(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from the file named by `GATEHOUSE_CONFIG`
    /// (default `gatehouse.yaml`) and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
        Self::load(Some(&path))
    }

    /// Loads configuration from an optional file and the environment.
    ///
    /// A missing file is not an error; every setting has a default.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a value is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder
            .add_source(
                config::Environment::with_prefix("GATEHOUSE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
