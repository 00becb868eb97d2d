//! Storefront cart service

use anyhow::Result;
use storefront_cart::config::load_config;
use storefront_cart::http::{router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = load_config()?;
    std::fs::create_dir_all(&config.snapshot_dir)?;
    let port = config.port;
    tracing::info!(snapshot_dir = %config.snapshot_dir.display(), remove_policy = ?config.remove_policy, region = ?config.default_region, "cart store configured");

    let app = router(AppState::new(config));
    tracing::info!("storefront-cart listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
