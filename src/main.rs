//! Backend Guard
//!
//! Resilience layer in front of a backend API, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌─────────────────────────────────────────────────────────┐
//!                              │                     BACKEND GUARD                        │
//!                              │                                                          │
//!     Caller Request           │  ┌─────────┐    ┌────────────┐    ┌──────────────┐      │
//!     ─────────────────────────┼─▶│ guarded │───▶│ resilience │───▶│  transport   │──────┼──▶ Backend
//!                              │  │ client  │    │  retries   │    │   (hyper)    │      │     API
//!                              │  └────┬────┘    └────────────┘    └──────────────┘      │
//!                              │       │ terminal failure                                 │
//!                              │       ▼                                                  │
//!                              │  ┌───────────┐   network-class   ┌──────────────┐       │
//!                              │  │ reporting │──────────────────▶│    health    │───────┼──▶ /health
//!                              │  │  + queue  │                   │   monitor    │       │
//!                              │  └─────┬─────┘                   └──────────────┘       │
//!                              │        │ high / critical                                 │
//!                              │        ▼                                                 │
//!                              │  notify, navigate to /error, reload                      │
//!                              │                                                          │
//!                              │  ┌────────────────────────────────────────────────────┐ │
//!                              │  │              Cross-Cutting Concerns                 │ │
//!                              │  │  ┌─────────┐ ┌────────┐ ┌──────────┐ ┌───────────┐ │ │
//!                              │  │  │ config  │ │ admin  │ │observa-  │ │ lifecycle │ │ │
//!                              │  │  │ + watch │ │  API   │ │ bility   │ │           │ │ │
//!                              │  │  └─────────┘ └────────┘ └──────────┘ └───────────┘ │ │
//!                              │  └────────────────────────────────────────────────────┘ │
//!                              └─────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use backend_guard::admin::setup_admin_router;
use backend_guard::config::{load_config, parse_config, ConfigWatcher};
use backend_guard::lifecycle::{shutdown_signal, GuardContext};
use backend_guard::observability::{logging, metrics};

const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "backend-guard")]
#[command(about = "Retry, health monitoring and error reporting for a backend API", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "BACKEND_GUARD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => parse_config("")?,
    };

    logging::init_logging(&config.observability);
    tracing::info!("backend-guard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        base_url = %config.api.base_url,
        config_file = ?args.config,
        max_attempts = config.retries.max_attempts,
        health_interval_ms = config.health_check.interval_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let admin = config.admin.clone();
    let ctx = Arc::new(GuardContext::from_config(config)?);
    ctx.start();

    if admin.enabled {
        let listener = TcpListener::bind(&admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");

        let router = setup_admin_router(ctx.clone());
        let mut shutdown = ctx.shutdown_handle().subscribe();
        ctx.shutdown_handle().track(tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API server failed");
            }
            tracing::info!("Admin API stopped");
        }));
    }

    // Dropping the notify watcher stops it, so it lives until main returns.
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let watcher = watcher.run()?;

            let reload_ctx = ctx.clone();
            let mut shutdown = ctx.shutdown_handle().subscribe();
            ctx.shutdown_handle().track(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        update = updates.recv() => match update {
                            Some(new_config) => reload_ctx.apply_config_update(new_config),
                            None => break,
                        },
                        _ = shutdown.recv() => break,
                    }
                }
            }));
            Some(watcher)
        }
        None => None,
    };

    shutdown_signal().await;

    if !ctx.shutdown(SHUTDOWN_DEADLINE).await {
        tracing::warn!("Some background tasks did not stop in time");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
