//! System Ticket Engine - Entry Point
//!
//! Initializes configuration, logging, storage and the ticket intake
//! API. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Open the file-backed ticket repository
//! 4. Create the Prometheus registry and the ticket service
//! 5. Spawn health server (/live + /ready)
//! 6. Spawn metrics server (/metrics) when enabled
//! 7. Spawn storage health probe
//! 8. Spawn ticket API (POST /ticket, GET /ticket/:id)
//! 9. Wait for SIGINT → graceful shutdown (stop intake → drain → exit)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use system_ticket_engine::adapters::http;
use system_ticket_engine::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use system_ticket_engine::adapters::persistence::RepositoryImpl;
use system_ticket_engine::config;
use system_ticket_engine::ports::repository::TicketRepository;
use system_ticket_engine::usecases::TicketService;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.service.log_level)
                }),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        max_combinations = config.settlement.max_combinations,
        "Starting System Ticket Engine"
    );

    // ── 3. Shutdown signal channel ──────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 4. Open storage ─────────────────────────────────────
    let repo = Arc::new(
        RepositoryImpl::from_data_dir(&config.persistence.data_dir)
            .await
            .context("Failed to open ticket storage")?,
    );

    // ── 5. Metrics registry + ticket service ────────────────
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
    let service = Arc::new(
        TicketService::new(Arc::clone(&repo), &config.settlement)
            .with_metrics(Arc::clone(&metrics)),
    );

    // ── 6. Spawn health server ──────────────────────────────
    let health_state = Arc::new(HealthState::new());
    let health_server = HealthServer::new(Arc::clone(&health_state), config.metrics.health_port);
    let health_handle = tokio::spawn({
        let shutdown = shutdown_tx.subscribe();
        async move {
            if let Err(e) = health_server.run(shutdown).await {
                error!(error = %e, "Health server failed");
            }
        }
    });

    // ── 7. Spawn metrics server ─────────────────────────────
    let metrics_handle = if config.metrics.enabled {
        let shutdown = shutdown_tx.subscribe();
        let bind_address = config.metrics.bind_address.clone();
        let registry = Arc::clone(&metrics);
        Some(tokio::spawn(async move {
            if let Err(e) = registry.serve(bind_address, shutdown).await {
                error!(error = %e, "Metrics server failed");
            }
        }))
    } else {
        warn!("Metrics export disabled");
        None
    };

    // ── 8. Spawn storage health probe ───────────────────────
    let probe_handle = tokio::spawn(probe_storage(
        Arc::clone(&repo),
        Arc::clone(&health_state),
        Duration::from_secs(config.persistence.health_check_interval_seconds),
        shutdown_tx.subscribe(),
    ));

    // ── 9. Spawn ticket intake API ──────────────────────────
    let api_handle = tokio::spawn({
        let shutdown = shutdown_tx.subscribe();
        let bind_address = config.api.bind_address.clone();
        let service = Arc::clone(&service);
        async move {
            if let Err(e) = http::serve(service, bind_address, shutdown).await {
                error!(error = %e, "Ticket API failed");
            }
        }
    });

    info!("All tasks spawned - service is running");

    // ── 10. Wait for SIGINT ─────────────────────────────────
    signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("SIGINT received, initiating graceful shutdown");

    // ── Graceful shutdown: stop intake → drain → exit ──────

    // 1. Readiness probe → 503
    health_state.accepting_tickets.store(false, Ordering::Relaxed);

    // 2. Signal all tasks to stop
    let _ = shutdown_tx.send(());
    info!("Shutdown signal broadcast to all tasks");

    // 3. Let in-flight settlements finish (up to 30s)
    if tokio::time::timeout(Duration::from_secs(30), api_handle)
        .await
        .is_err()
    {
        warn!("Ticket API did not drain within 30s");
    }

    let _ = tokio::time::timeout(Duration::from_secs(5), probe_handle).await;
    if let Some(handle) = metrics_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
    let _ = tokio::time::timeout(Duration::from_secs(5), health_handle).await;

    info!("Shutdown complete");
    Ok(())
}

/// Periodically check storage and publish the result to readiness.
async fn probe_storage(
    repo: Arc<RepositoryImpl>,
    health: Arc<HealthState>,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        let healthy = repo.is_healthy().await;
        let was_healthy = health.storage_healthy.swap(healthy, Ordering::Relaxed);
        if was_healthy && !healthy {
            warn!("Ticket storage became unhealthy");
        } else if !was_healthy && healthy {
            info!("Ticket storage recovered");
        }

        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }
}
