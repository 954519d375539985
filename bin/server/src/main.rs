use gatehouse_core::ProviderName;
use gatehouse_flow::providers::{OAuth2Config, OAuth2Provider};
use gatehouse_flow::{ProviderRegistry, StateTokens};
use gatehouse_server::{app, config::ServerConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!(users = config.users.len(), "Loaded configuration");

    if config.oauth.key.is_empty() {
        tracing::warn!("no OAuth client key configured; logins will be rejected by the provider");
    }

    let google = ProviderName::google();
    let provider = OAuth2Provider::new(
        google.clone(),
        OAuth2Config::google(
            config.oauth.key.clone(),
            config.oauth.secret.clone(),
            config.oauth.redirect_for(&google),
        ),
    )
    .expect("invalid Google provider configuration");

    let registry = ProviderRegistry::new().with(Arc::new(provider));
    let app = app::build_app(&config, registry, StateTokens::from_os_rng());

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
