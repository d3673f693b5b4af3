mod swarm;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use waitroom_core::{load_config, validate_config};

use swarm::Swarm;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("waitroom-swarm v{}", VERSION);

    // Determine config path
    let config_path = std::env::var("WAITROOM_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("waitroom.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Target: {}", config.target.host);
    info!("Room: {}", config.session.room);
    info!(
        "Users: {}, iterations per user: {}",
        config.swarm.users,
        config
            .swarm
            .iterations
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unbounded".to_string())
    );

    let swarm = Swarm::new(config);

    let shutdown = swarm.shutdown_handle();
    let stopped_by_signal = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping users...");
        shutdown.trigger();
    });

    let outcomes = swarm.run().await.context("Swarm failed")?;

    if stopped_by_signal.is_triggered() {
        info!("Run interrupted, {} users stopped", outcomes.len());
    } else {
        info!("All {} users stopped", outcomes.len());
    }
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
