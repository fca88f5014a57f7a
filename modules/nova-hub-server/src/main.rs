use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use nova_hub_common::AppConfig;
use nova_hub_events::EventBus;
use nova_hub_processor::{BatchProcessor, SingletonGuard};
use nova_hub_server::{build_router, AppState};
use nova_hub_watcher::PacketWatcher;

#[derive(Parser)]
#[command(name = "nova-hub-server", about = "Nova Hub federation routing node")]
struct Cli {
    /// Path to the per-league TOML config (dosemu command tables).
    #[arg(long, default_value = "./config/nova-hub.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    tracing::info!("starting nova-hub-server");

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let config_path = cli.config.canonicalize().with_context(|| {
        format!(
            "config file not found: {}. Create one or specify --config <path>",
            cli.config.display()
        )
    })?;
    let file_config = Arc::new(nova_hub_common::load_config(&config_path)?);
    tracing::info!(config = %config_path.display(), "league config loaded");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("migrations complete");

    let data_dir = PathBuf::from(&config.data_dir);
    let events = Arc::new(EventBus::new());

    let processor = Arc::new(BatchProcessor::new(
        pool.clone(),
        Arc::clone(&file_config),
        data_dir.clone(),
        config.dosemu_path.clone(),
        PathBuf::from(&config.dosemu_config_dir),
        Duration::from_secs(config.dosemu_timeout_secs),
        Arc::clone(&events),
        config.hub_bbs_index,
    ));
    let singleton = Arc::new(SingletonGuard::new());

    let watcher = PacketWatcher::new(pool.clone(), Arc::clone(&file_config), data_dir.clone(), Arc::clone(&events));
    tokio::spawn(async move {
        if let Err(e) = watcher.run().await {
            tracing::error!(error = %e, "directory watcher exited");
        }
    });

    let state = Arc::new(AppState {
        pool,
        file_config,
        data_dir,
        events,
        processor,
        singleton,
        hub_bbs_index: config.hub_bbs_index,
        operator_token: config.operator_token.clone(),
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    tracing::info!(host = %config.host, port = config.port, "listening");

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

