//! Ticket Service - Intake, Validation and Settlement Dispatch
//!
//! Entry point for every submitted ticket:
//! - Validates stake and selections
//! - Persists the ticket as `pending`
//! - Dispatches to system or normal settlement
//! - Marks the ticket `rejected` when settlement fails
//!
//! Outcomes are logged and, when a registry is attached, counted in
//! Prometheus.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::config::SettlementConfig;
use crate::domain::error::SettlementError;
use crate::domain::exposure::settle_single;
use crate::domain::ticket::{SelectionSnapshot, SettlementResult, TicketId, TicketType};
use crate::ports::repository::{
  CombinationRecord, NewTicket, TicketRecord, TicketRepository, TicketSettlement,
};

use super::system_settlement::{rollback, SystemSettlement};

/// Why a submitted ticket was not accepted.
#[derive(Debug, Error)]
pub enum TicketError {
  /// The submission is malformed; nothing was stored.
  #[error("invalid ticket: {0}")]
  Validation(String),

  /// The ticket could not be stored.
  #[error("failed to store ticket: {0}")]
  Storage(anyhow::Error),

  /// The ticket was stored but settlement failed; it is now rejected.
  #[error(transparent)]
  Settlement(#[from] SettlementError),
}

impl TicketError {
  /// Stable label for metrics and logs.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Validation(_) => "validation",
      Self::Storage(_) => "persistence",
      Self::Settlement(e) => e.kind(),
    }
  }

  /// True when the submitter is at fault rather than the service.
  pub fn is_client_error(&self) -> bool {
    match self {
      Self::Validation(_) => true,
      Self::Storage(_) => false,
      Self::Settlement(e) => e.is_input_error(),
    }
  }
}

/// Ticket intake and settlement orchestration.
pub struct TicketService<R: TicketRepository> {
  repo: Arc<R>,
  system: SystemSettlement<R>,
  metrics: Option<Arc<MetricsRegistry>>,
}

impl<R: TicketRepository> TicketService<R> {
  /// Create a new ticket service.
  pub fn new(repo: Arc<R>, config: &SettlementConfig) -> Self {
    let system = SystemSettlement::new(Arc::clone(&repo), config.max_combinations);
    Self {
      repo,
      system,
      metrics: None,
    }
  }

  /// Attach a Prometheus registry for outcome metrics.
  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  /// The repository backing this service.
  pub fn repository(&self) -> &Arc<R> {
    &self.repo
  }

  /// Validate, store and settle a submitted ticket.
  ///
  /// Returns the new ticket id once its combinations are committed.
  ///
  /// # Errors
  /// [`TicketError::Validation`] before anything is stored; otherwise the
  /// storage or settlement failure. A ticket whose settlement fails is
  /// left in the `rejected` state.
  #[instrument(
    skip(self, ticket),
    fields(user_id = ticket.user_id, ticket_type = %ticket.ticket_type)
  )]
  pub async fn process_ticket(&self, ticket: &NewTicket) -> Result<TicketId, TicketError> {
    validate(ticket)?;

    let record = self
      .repo
      .create_ticket(ticket)
      .await
      .map_err(TicketError::Storage)?;

    info!(
      ticket_id = record.id,
      selections = record.selections.len(),
      system_combination = record.system_combination.as_deref().unwrap_or(""),
      "Processing ticket"
    );

    let started = Instant::now();
    let outcome = self.dispatch(&record).await;
    let ticket_type = record.ticket_type.to_string();

    match outcome {
      Ok(result) => {
        self.record_settled(&ticket_type, &result, started);
        Ok(record.id)
      }
      Err(e) => {
        warn!(ticket_id = record.id, kind = e.kind(), error = %e, "Settlement failed");
        self.record_failure(&ticket_type, e.kind());

        if let Err(reject_err) = self.repo.reject_ticket(record.id, &e.to_string()).await {
          error!(ticket_id = record.id, error = %reject_err, "Failed to mark ticket rejected");
        }
        Err(e.into())
      }
    }
  }

  async fn dispatch(&self, record: &TicketRecord) -> Result<SettlementResult, SettlementError> {
    match (record.ticket_type, record.system_combination.as_deref()) {
      (TicketType::System, Some(spec)) if !spec.is_empty() => {
        self.system.settle(record.id, record.total_stake, spec).await
      }
      _ => self.settle_normal(record.id, record.total_stake).await,
    }
  }

  /// One combination of every selection, carrying the whole stake.
  async fn settle_normal(
    &self,
    ticket_id: TicketId,
    total_stake: f64,
  ) -> Result<SettlementResult, SettlementError> {
    let selections = self
      .repo
      .load_selections(ticket_id)
      .await
      .map_err(SettlementError::Persistence)?;
    let snapshot = SelectionSnapshot::new(&selections);

    let (combination, result) = settle_single(total_stake, &snapshot)?;
    let settlement = TicketSettlement {
      total_odd: Some(combination.odds),
      potential_payout: Some(combination.potential_win),
      ..TicketSettlement::from(&result)
    };

    let mut tx = self
      .repo
      .begin_settlement(ticket_id)
      .await
      .map_err(SettlementError::Persistence)?;

    if let Err(e) = tx
      .insert_combination(&CombinationRecord::pending(ticket_id, &combination))
      .await
    {
      rollback(tx.as_mut(), ticket_id).await;
      return Err(SettlementError::Persistence(e));
    }

    if let Err(e) = tx.commit(&settlement).await {
      rollback(tx.as_mut(), ticket_id).await;
      return Err(SettlementError::Persistence(e));
    }

    info!(
      ticket_id,
      total_odd = combination.odds,
      max_payout = result.total_exposure,
      "Normal ticket settled"
    );

    Ok(result)
  }

  fn record_settled(&self, ticket_type: &str, result: &SettlementResult, started: Instant) {
    let Some(metrics) = &self.metrics else {
      return;
    };

    metrics
      .tickets_processed
      .with_label_values(&[ticket_type, "settled"])
      .inc();
    metrics
      .combinations_written
      .with_label_values(&[ticket_type])
      .inc_by(result.num_combinations);
    metrics
      .ticket_exposure
      .with_label_values(&[ticket_type])
      .observe(result.total_exposure);
    #[allow(clippy::cast_precision_loss)]
    let latency_us = started.elapsed().as_micros() as f64;
    metrics
      .settlement_latency_us
      .with_label_values(&[ticket_type])
      .observe(latency_us);
  }

  fn record_failure(&self, ticket_type: &str, kind: &str) {
    if let Some(metrics) = &self.metrics {
      metrics
        .tickets_processed
        .with_label_values(&[ticket_type, "rejected"])
        .inc();
      metrics
        .settlement_failures
        .with_label_values(&[ticket_type, kind])
        .inc();
    }
  }
}

/// Reject submissions the engine cannot price.
fn validate(ticket: &NewTicket) -> Result<(), TicketError> {
  if !(ticket.total_stake.is_finite() && ticket.total_stake > 0.0) {
    return Err(TicketError::Validation(format!(
      "total stake must be positive, got {}",
      ticket.total_stake
    )));
  }
  if ticket.selections.is_empty() {
    return Err(TicketError::Validation("ticket has no selections".into()));
  }

  for (i, selection) in ticket.selections.iter().enumerate() {
    if !(selection.odd_value.is_finite() && selection.odd_value > 0.0) {
      return Err(TicketError::Validation(format!(
        "selection {i} has invalid odds {}",
        selection.odd_value
      )));
    }
    if !(selection.stake.is_finite() && selection.stake > 0.0) {
      return Err(TicketError::Validation(format!(
        "selection {i} has invalid stake {}",
        selection.stake
      )));
    }
  }

  Ok(())
}
