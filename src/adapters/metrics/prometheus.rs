//! Prometheus Metrics Registry - Settlement Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards.
//! Covers ticket outcomes, settlement failures by kind, combination
//! volume, exposure and settlement latency.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Centralized Prometheus metrics for the settlement service.
///
/// All metrics follow the naming convention `system_ticket_*` and carry
/// a `ticket_type` label where it applies.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Tickets processed, by type and outcome (`settled` / `rejected`).
    pub tickets_processed: IntCounterVec,
    /// Settlement failures by error kind.
    pub settlement_failures: IntCounterVec,
    /// Combinations written.
    pub combinations_written: IntCounterVec,
    /// Total exposure per settled ticket.
    pub ticket_exposure: HistogramVec,
    /// Settlement latency histogram (microseconds).
    pub settlement_latency_us: HistogramVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let tickets_processed = IntCounterVec::new(
            Opts::new("system_ticket_tickets_processed_total", "Tickets processed"),
            &["ticket_type", "outcome"],
        )?;

        let settlement_failures = IntCounterVec::new(
            Opts::new(
                "system_ticket_settlement_failures_total",
                "Settlement failures by error kind",
            ),
            &["ticket_type", "kind"],
        )?;

        let combinations_written = IntCounterVec::new(
            Opts::new(
                "system_ticket_combinations_written_total",
                "Combination rows committed",
            ),
            &["ticket_type"],
        )?;

        let ticket_exposure = HistogramVec::new(
            HistogramOpts::new(
                "system_ticket_exposure",
                "Total exposure (sum of potential wins) per settled ticket",
            )
            .buckets(vec![
                10.0, 100.0, 1_000.0, 10_000.0, 100_000.0, 1_000_000.0,
            ]),
            &["ticket_type"],
        )?;

        let settlement_latency_us = HistogramVec::new(
            HistogramOpts::new(
                "system_ticket_settlement_latency_us",
                "Settlement latency in microseconds",
            )
            .buckets(vec![
                100.0, 500.0, 1000.0, 5000.0, 10000.0, 50000.0, 250000.0,
            ]),
            &["ticket_type"],
        )?;

        // Register all metrics
        registry.register(Box::new(tickets_processed.clone()))?;
        registry.register(Box::new(settlement_failures.clone()))?;
        registry.register(Box::new(combinations_written.clone()))?;
        registry.register(Box::new(ticket_exposure.clone()))?;
        registry.register(Box::new(settlement_latency_us.clone()))?;

        Ok(Self {
            registry,
            tickets_processed,
            settlement_failures,
            combinations_written,
            ticket_exposure,
            settlement_latency_us,
        })
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics_self);
                async move {
                    metrics
                        .render()
                        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
