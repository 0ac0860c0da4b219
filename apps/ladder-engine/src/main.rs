//! Ladder Engine Binary
//!
//! Starts the ladder engine: the periodic reconciliation driver plus the
//! HTTP control API.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin ladder-engine
//! ```
//!
//! # Environment Variables
//!
//! - `LADDER_CONFIG`: Path to the YAML config (default: config.yaml)
//! - `ALPACA_KEY` / `ALPACA_SECRET`: Referenced from config via `${VAR}`
//! - `RUST_LOG`: Overrides `observability.logging.level`

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use ladder_engine::application::ports::BrokerGateway;
use ladder_engine::application::services::LadderDriver;
use ladder_engine::application::use_cases::LadderEngine;
use ladder_engine::config::{BrokerMode, Config, DEFAULT_CONFIG_PATH, load_config};
use ladder_engine::infrastructure::advisor::EchoAdvisor;
use ladder_engine::infrastructure::broker::{AlpacaBrokerAdapter, PaperBroker};
use ladder_engine::infrastructure::http::{AppState, create_router};
use ladder_engine::infrastructure::persistence::JsonFileInstrumentStore;
use ladder_engine::telemetry::init_tracing;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable naming the config file.
const CONFIG_PATH_ENV: &str = "LADDER_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        load_config(Some(&config_path))
            .with_context(|| format!("loading configuration from {config_path}"))?
    } else {
        Config::default()
    };

    init_tracing(&config.observability.logging)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    tracing::info!("Starting ladder engine");
    log_config(&config, &config_path);

    match config.broker.mode {
        BrokerMode::Alpaca => {
            let adapter = AlpacaBrokerAdapter::new(config.broker.alpaca.adapter_config()?)?;
            tracing::info!(live = adapter.is_live(), "Using Alpaca broker");
            run(Arc::new(adapter), &config).await
        }
        BrokerMode::Paper => {
            tracing::info!("Using paper broker");
            run(Arc::new(PaperBroker::new()), &config).await
        }
    }
}

/// Wire the engine around `broker`, then serve until a shutdown signal.
async fn run<B>(broker: Arc<B>, config: &Config) -> anyhow::Result<()>
where
    B: BrokerGateway + 'static,
{
    let store = Arc::new(JsonFileInstrumentStore::new(&config.persistence.path));
    let engine = Arc::new(
        LadderEngine::bootstrap(broker, store, config.engine.ladder_engine()).await,
    );

    let shutdown_token = CancellationToken::new();
    let driver = LadderDriver::new(
        Arc::clone(&engine),
        config.engine.driver(),
        shutdown_token.clone(),
    )
    .spawn();

    let shutdown_engine = Arc::clone(&engine);
    let state = AppState::new(engine, Arc::new(EchoAdvisor::new()), env!("CARGO_PKG_VERSION"));
    let app = create_router(state);

    let http_addr = config.server.socket_address();
    let listener = TcpListener::bind(http_addr.as_str())
        .await
        .with_context(|| format!("binding HTTP listener on {http_addr}"))?;

    tracing::info!(%http_addr, "HTTP server starting");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  GET  /api/v1/instruments");
    tracing::info!("  POST /api/v1/instruments");
    tracing::info!("  POST /api/v1/instruments/toggle");
    tracing::info!("  POST /api/v1/instruments/remove");
    tracing::info!("  POST /api/v1/reconcile");
    tracing::info!("  POST /api/v1/advisor");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
        .await;
    if let Err(e) = &served {
        tracing::error!("HTTP server error: {e}");
    }

    // The HTTP server can also stop on its own; the driver must follow.
    shutdown_token.cancel();
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, driver).await {
        Ok(Ok(())) => tracing::info!("Ladder driver stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "Ladder driver task failed"),
        Err(_) => {
            tracing::warn!(
                timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
                "Ladder driver did not stop in time, saving book directly"
            );
            shutdown_engine.persist().await;
        }
    }

    tracing::info!("Ladder engine stopped");
    served.context("HTTP server failed")
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Walk up from the working directory to the first `.env`.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the loaded configuration.
fn log_config(config: &Config, path: &str) {
    tracing::info!(
        config_path = path,
        broker = %config.broker.mode,
        interval_secs = config.engine.interval_secs,
        order_quantity = %config.engine.order_quantity,
        http_address = %config.server.socket_address(),
        book_path = %config.persistence.path,
        "Configuration loaded"
    );
}

/// Wait for SIGINT or SIGTERM, then cancel `shutdown_token`.
///
/// # Panics
///
/// Panics if signal handlers cannot be installed; a process that cannot
/// receive termination signals should not start.
#[allow(clippy::expect_used)]
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        () = shutdown_token.cancelled() => {}
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
