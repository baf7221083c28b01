//! System Settlement Use Case - Combination Expansion with Persistence
//!
//! Drives the domain engine against the repository port:
//! 1. Parse the ticket's combination spec
//! 2. Load the selection snapshot and split fixed from free
//! 3. Plan the run and enforce the combination bound
//! 4. Stream every priced combination into a settlement transaction
//! 5. Commit the totals onto the ticket
//!
//! The first failure aborts the run and rolls the transaction back,
//! including a failed commit, so a ticket never ends up with a partial
//! set of combinations.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::domain::error::{ConfigurationError, LookupError, SettlementError};
use crate::domain::exposure::{ExposureTracker, SettlementPlan};
use crate::domain::system_spec;
use crate::domain::ticket::{Combination, SelectionSnapshot, SettlementResult, TicketId};
use crate::ports::repository::{
  CombinationRecord, SettlementTransaction, TicketRepository, TicketSettlement,
};

/// Settles system tickets through a [`TicketRepository`].
pub struct SystemSettlement<R: TicketRepository> {
  repo: Arc<R>,
  /// Upper bound on combinations per ticket.
  max_combinations: u64,
}

impl<R: TicketRepository> SystemSettlement<R> {
  /// Create a new system settlement use case.
  pub fn new(repo: Arc<R>, max_combinations: u64) -> Self {
    Self {
      repo,
      max_combinations,
    }
  }

  /// Expand, price and persist every combination of a stored ticket.
  ///
  /// # Errors
  /// Parse and configuration errors are raised before the transaction
  /// opens, so nothing is written for them. Lookup and persistence
  /// errors roll back whatever was staged.
  #[instrument(skip(self))]
  pub async fn settle(
    &self,
    ticket_id: TicketId,
    total_stake: f64,
    raw_spec: &str,
  ) -> Result<SettlementResult, SettlementError> {
    let spec = system_spec::parse(raw_spec)?;

    let selections = self
      .repo
      .load_selections(ticket_id)
      .await
      .map_err(SettlementError::Persistence)?;
    let snapshot = SelectionSnapshot::new(&selections);

    info!(
      fixed = snapshot.fixed().len(),
      free = snapshot.free().len(),
      spec = %spec,
      "Selection snapshot loaded"
    );

    let plan = SettlementPlan::new(total_stake, spec, &snapshot)?;
    if plan.num_combinations() > self.max_combinations {
      return Err(
        ConfigurationError::TooManyCombinations {
          count: plan.num_combinations(),
          limit: self.max_combinations,
        }
        .into(),
      );
    }

    debug!(
      combinations = plan.num_combinations(),
      stake_per_combination = plan.stake_per_combination(),
      "Settlement plan ready"
    );

    let mut tx = self
      .repo
      .begin_settlement(ticket_id)
      .await
      .map_err(SettlementError::Persistence)?;

    let tracker = stage_combinations(tx.as_mut(), ticket_id, plan.combinations(&snapshot)).await?;

    let result = tracker.finish(&plan);
    if let Err(e) = tx.commit(&TicketSettlement::from(&result)).await {
      rollback(tx.as_mut(), ticket_id).await;
      return Err(SettlementError::Persistence(e));
    }

    info!(
      ticket_id,
      combinations = result.num_combinations,
      max_payout = result.total_exposure,
      min_payout = result.min_payout,
      "System ticket settled"
    );

    Ok(result)
  }
}

/// Stage each priced combination, rolling the transaction back at the
/// first error.
async fn stage_combinations<I>(
  tx: &mut dyn SettlementTransaction,
  ticket_id: TicketId,
  combinations: I,
) -> Result<ExposureTracker, SettlementError>
where
  I: IntoIterator<Item = Result<Combination, LookupError>>,
{
  let mut tracker = ExposureTracker::new();

  for combination in combinations {
    if let Err(e) = stage_one(tx, ticket_id, combination, &mut tracker).await {
      rollback(tx, ticket_id).await;
      return Err(e);
    }
  }

  Ok(tracker)
}

async fn stage_one(
  tx: &mut dyn SettlementTransaction,
  ticket_id: TicketId,
  combination: Result<Combination, LookupError>,
  tracker: &mut ExposureTracker,
) -> Result<(), SettlementError> {
  let combination = combination?;
  tx.insert_combination(&CombinationRecord::pending(ticket_id, &combination))
    .await
    .map_err(SettlementError::Persistence)?;
  tracker.record(&combination);
  Ok(())
}

pub(crate) async fn rollback(tx: &mut dyn SettlementTransaction, ticket_id: TicketId) {
  if let Err(e) = tx.rollback().await {
    warn!(ticket_id, error = %e, "Rollback failed");
  }
}
