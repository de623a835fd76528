use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use persistence::db;
use tracing::info;

use iiko_bridge_api::app::{create_app, AppState};
use iiko_bridge_api::config::Config;
use iiko_bridge_api::jobs::{CatalogSyncJob, JobScheduler, PoolMetricsJob};
use iiko_bridge_api::middleware::{init_metrics, logging::init_logging};
use iiko_bridge_api::services::{IikoClient, TelegramNotifier};

const JOB_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    init_logging(&config.logging).context("Failed to initialize logging")?;
    init_metrics().context("Failed to initialize metrics")?;

    info!("Starting iiko bridge v{}", env!("CARGO_PKG_VERSION"));

    let pool = db::connect(&config.database.url, &config.database.pool_settings())
        .await
        .context("Failed to connect to database")?;

    info!("Running database migrations...");
    db::migrate(&pool).await.context("Failed to run migrations")?;
    info!("Migrations completed");

    let gateway = Arc::new(IikoClient::new(&config.pos)?);
    let notifier = Arc::new(TelegramNotifier::new(&config.notifications)?);
    if !notifier.is_configured() {
        info!("Telegram notifications disabled");
    }

    let addr = config.socket_addr()?;
    let state = AppState::new(config.clone(), pool.clone(), gateway, notifier);

    let mut scheduler = JobScheduler::new();
    scheduler.register(PoolMetricsJob::new(pool));
    if config.sync.enabled {
        scheduler.register(CatalogSyncJob::new(state.catalog_sync.clone(), &config.sync));
    } else {
        info!("Scheduled catalog sync disabled");
    }
    scheduler.start();

    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(JOB_SHUTDOWN_TIMEOUT).await;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
