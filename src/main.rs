//! ==============================================================================
//! main.rs - monitor entry point
//! ==============================================================================
//!
//! purpose:
//!     wire configuration, http clients, the poll loop and the dashboard
//!     server together, then run until ctrl-c.
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────────┐
//!     │                 vinheria-monitor (this file)             │
//!     │  ┌───────────────┐               ┌────────────────────┐  │
//!     │  │ poll loop     │   AppState    │ web server         │  │
//!     │  │ (3s cycle)    │──────────────▶│ (port 8050)        │  │
//!     │  └───┬───────┬───┘  Arc<RwLock>  └────────────────────┘  │
//!     └──────┼───────┼───────────────────────────────────────────┘
//!            │       │
//!   GET lastN│       │PATCH attrs (only on change)
//!            ▼       ▼
//!     ┌───────────┐ ┌───────────┐
//!     │ STH-Comet │ │  Orion    │──▶ iot agent ──▶ lamp
//!     └───────────┘ └───────────┘
//!
//! ==============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::RwLock;

use vinheria_monitor::config::MonitorConfig;
use vinheria_monitor::dispatcher::{AlertState, CommandDispatcher, OrionActuator};
use vinheria_monitor::domain::AppState;
use vinheria_monitor::poll::PollLoop;
use vinheria_monitor::server::{self, ServerState};
use vinheria_monitor::store::{self, StoreClient};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// path to monitor.toml (default: config/monitor.toml, ../config/monitor.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // step 1: load configuration, then logging at the configured level
    let (config, source) = MonitorConfig::load_or_default(cli.config.as_deref())?;
    init_tracing(&config.logging.level);

    match source {
        Some(path) => tracing::info!("[CONFIG] Loaded from {}", path.display()),
        None => tracing::warn!("[CONFIG] No config file found - using defaults"),
    }
    config.print_summary();

    // step 2: shared state + clients
    let state = Arc::new(RwLock::new(AppState::default()));
    let zone = config.zone()?;
    let http = store::build_http_client(&config.store).context("building http client")?;

    let store_client = StoreClient::new(http.clone(), config.store.clone(), config.device.clone());
    let actuator = OrionActuator::new(http, config.store.clone(), config.device.clone());
    let dispatcher = CommandDispatcher::new(actuator, AlertState::new());

    // step 3: web server in background
    let server_state = ServerState {
        app: state.clone(),
        title: Arc::from(config.dashboard.title.as_str()),
        refresh_seconds: config.polling.interval_seconds,
    };
    let bind_addr = config.dashboard.bind_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = server::run_server(&bind_addr, server_state).await {
            tracing::error!("[ERROR] Web server error: {:#}", e);
        }
    });

    // step 4: poll loop in the foreground until ctrl-c
    let mut poll = PollLoop::new(
        store_client,
        dispatcher,
        config.thresholds,
        config.polling.clone(),
        zone,
        state,
    )
    .show_sensor_data(config.logging.show_sensor_data);

    poll.run_until(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("[ERROR] Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await;

    Ok(())
}

/// fmt subscriber; RUST_LOG wins over the configured level
fn init_tracing(level: &str) {
    let default_directive: tracing_subscriber::filter::Directive = level
        .parse()
        .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::INFO.into());

    let _ = tracing_subscriber::fmt::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_directive)
                .from_env_lossy(),
        )
        .try_init();
}
