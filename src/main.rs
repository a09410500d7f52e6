use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

use trust_ledger::{
    api::{create_app, SecurityMiddlewareConfig, SecurityState},
    config::LedgerConfig,
    database::SnapshotRepository,
    reputation::{ReputationManager, ReputationState},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first - this validates all security requirements
    let config = LedgerConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {:#}", e);
        eprintln!("Please check TRUST_LEDGER_* environment variables.");
        e
    })?;

    init_logging(&config)?;

    info!("Starting trust ledger server");
    info!(
        "Security settings: Auth enabled: {}, Rate limit: {}/min",
        config.security.enable_auth, config.security.rate_limit_per_minute
    );

    let administrator = config.administrator()?;
    let snapshots = config
        .ledger
        .snapshot_path
        .clone()
        .map(|path| Arc::new(SnapshotRepository::new(path)));

    let state = match snapshots {
        Some(ref repo) => repo.load_or_new(&administrator).await?,
        None => {
            warn!("No snapshot path configured - state will be lost on shutdown");
            ReputationState::new(administrator.clone())
        }
    };

    let mut manager = ReputationManager::from_state(state, config.ledger.max_events);
    if let Some(ref repo) = snapshots {
        manager = manager.with_snapshots(repo.clone());
        spawn_snapshot_task(
            manager.clone(),
            Duration::from_secs(config.ledger.snapshot_interval_secs),
        );
        info!(path = %repo.path().display(), "Snapshot persistence enabled");
    }
    info!(administrator = %administrator, "Reputation ledger ready");

    let security_state = SecurityState::new(SecurityMiddlewareConfig::from(&config));
    spawn_rate_limit_cleanup(security_state.clone());

    let app = create_app(manager.clone(), security_state);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!("Trust ledger listening on {}", bind_addr);
    info!(
        "Security middleware: Auth={}, Rate limit={}/min, Max body={}KB",
        config.security.enable_auth,
        config.security.rate_limit_per_minute,
        config.security.max_request_size / 1024
    );

    // Serve with connect info for client IP extraction
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    manager
        .persist()
        .await
        .context("Failed to write final snapshot")?;
    info!("Trust ledger stopped");

    Ok(())
}

/// Initialize logging; RUST_LOG overrides the configured level
fn init_logging(config: &LedgerConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_lowercase()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(if config.logging.log_requests {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    if config.logging.sanitize_logs {
        info!("Logging initialized with client address masking enabled");
    }

    Ok(())
}

fn spawn_snapshot_task(manager: ReputationManager, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = manager.persist().await {
                error!("Periodic snapshot failed: {:#}", e);
            }
        }
    });
}

fn spawn_rate_limit_cleanup(security: SecurityState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            security.rate_limiter.cleanup();
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
