use std::sync::Arc;

use mimalloc::MiMalloc;
use storefront::config::Config;
use storefront::db::SessionManager;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::from_env()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        project = %cfg.project_name,
        pool_size = cfg.database_pool_size,
        echo = cfg.database_echo,
        loglevel = %cfg.loglevel
    );

    let manager = Arc::new(SessionManager::new());
    manager
        .init(&cfg.database_url, cfg.engine_options())
        .await?;

    if let Err(e) = manager.ensure_schema().await {
        error!(error = %e, "schema initialization failed");
        manager.close().await?;
        return Err(e.into());
    }

    info!("storage ready; waiting for shutdown signal");
    tokio::signal::ctrl_c().await?;

    info!("shutdown requested");
    manager.close().await?;
    Ok(())
}
