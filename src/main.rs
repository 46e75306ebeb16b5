use anyhow::Context;
use tracing_subscriber::EnvFilter;

use apidon_api::{app, config, config::StoreBackend, is_production, state::AppState, store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting Apidon API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set outside development");
    }

    if is_production!() && config.store.backend == StoreBackend::Memory {
        tracing::warn!("running production on the in-memory store, data is lost on restart");
    }

    let store = store::connect(&config.store)
        .await
        .context("failed to connect document store")?;
    tracing::info!(backend = ?config.store.backend, "document store ready");

    let state = AppState::new(store, config.clone()).context("invalid provider configuration")?;

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Apidon API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
