use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use server::auth::JwtIdentity;
use server::config::Config;
use server::{AppState, app};
use services::services::itinerary_generator::ItineraryGenerator;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().context("loading configuration")?;

    let pool = db::create_pool(&config.database_url)
        .await
        .with_context(|| format!("connecting to {}", config.database_url))?;
    db::run_migrations(&pool).await.context("running migrations")?;

    let generator = ItineraryGenerator::from_env().context("building itinerary generator")?;
    let identity = Arc::new(JwtIdentity::new(&config.session_secret));

    let state = AppState {
        pool,
        identity,
        generator: Arc::new(generator),
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("parsing bind address")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{addr}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}
