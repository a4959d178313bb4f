//! WMS API service.
//!
//! HTTP server implementing OGC WMS 1.3.0 over gridded datasets.

use anyhow::{Context, Result};
use clap::Parser;
use std::{env, net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use storage::CacheWiper;
use wms_api::config::ServerConfig;
use wms_api::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "wms-api")]
#[command(about = "OGC WMS server for gridded data")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Dataset registry (YAML). Overrides DATASETS_CONFIG.
    #[arg(short, long, env = "DATASETS_CONFIG")]
    config: Option<PathBuf>,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long)]
    worker_threads: Option<usize>,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level);

    // Build tokio runtime with configurable worker threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        info!("Configuring tokio runtime with {} worker threads", threads);
        runtime_builder.worker_threads(threads);
    } else if let Some(threads) = env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
    {
        info!("Configuring tokio runtime with {} worker threads (from env)", threads);
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(args))
}

/// JSON logs. `RUST_LOG` wins over `--log-level` when set.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();
}

async fn async_main(args: Args) -> Result<()> {
    // Initialize Prometheus metrics exporter
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    info!("Prometheus metrics exporter initialized");

    let mut config = ServerConfig::from_env();
    if let Some(path) = args.config {
        config.datasets_config = path;
    }
    info!(
        title = %config.title,
        max_width = config.max_image_width,
        max_height = config.max_image_height,
        wipe_interval_secs = config.cache_wipe_interval.as_secs(),
        "Starting WMS API server"
    );

    let wiper_config = config.wiper_config();
    let state = Arc::new(AppState::from_config(config)?);

    // Periodic cache wipe, stopped on shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let wiper = CacheWiper::new(Arc::clone(&state.cache), wiper_config).spawn(shutdown_rx);

    let app = wms_api::router(state, prometheus_handle);

    let addr: SocketAddr = args.listen.parse()?;
    info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    if shutdown_tx.send(true).is_err() {
        warn!("Cache wiper already stopped");
    }
    wiper.await.context("cache wiper task panicked")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
