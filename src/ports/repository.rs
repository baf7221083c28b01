//! Repository Port - Ticket Persistence Interface
//!
//! Defines what the use cases need from storage: creating tickets,
//! reading the selection snapshot, and writing a ticket's combinations
//! and settlement totals as one all-or-nothing transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ticket::{
  BetStatus, Combination, Selection, SelectionId, SettlementResult, TicketId, TicketType,
};

// ────────────────────────────────────────────
// Intake payload
// ────────────────────────────────────────────

/// A ticket as submitted, before storage assigns identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTicket {
  pub user_id: u64,
  pub total_stake: f64,
  pub ticket_type: TicketType,
  /// Raw choice-size specification, e.g. `"2/4,3/4"`. System tickets only.
  #[serde(default)]
  pub system_combination: Option<String>,
  pub selections: Vec<NewSelection>,
}

/// A selection as submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSelection {
  pub sport_type: String,
  pub league: String,
  pub home_team: String,
  pub away_team: String,
  pub event_date: DateTime<Utc>,
  pub market_type: String,
  pub selected_outcome: String,
  pub odd_value: f64,
  pub stake: f64,
  #[serde(default)]
  pub eid: String,
  #[serde(default)]
  pub selection_type: String,
  #[serde(default)]
  pub is_fixed: bool,
}

// ────────────────────────────────────────────
// Stored records
// ────────────────────────────────────────────

/// A persisted selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionRecord {
  pub id: SelectionId,
  #[serde(flatten)]
  pub details: NewSelection,
  pub status: BetStatus,
}

impl SelectionRecord {
  /// The engine's view of this selection.
  pub fn to_selection(&self) -> Selection {
    Selection {
      id: self.id,
      odds: self.details.odd_value,
      is_fixed: self.details.is_fixed,
    }
  }
}

/// A persisted ticket with its selections and settlement totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketRecord {
  pub id: TicketId,
  pub user_id: u64,
  pub total_stake: f64,
  pub ticket_type: TicketType,
  pub system_combination: Option<String>,
  pub status: BetStatus,
  pub created_at: DateTime<Utc>,
  pub selections: Vec<SelectionRecord>,
  /// Filled in when settlement commits.
  #[serde(default)]
  pub settlement: Option<TicketSettlement>,
  /// Why settlement failed, for rejected tickets.
  #[serde(default)]
  pub rejection_reason: Option<String>,
}

impl TicketRecord {
  /// Selections in stored order, as the engine sees them.
  pub fn snapshot_selections(&self) -> Vec<Selection> {
    self.selections.iter().map(SelectionRecord::to_selection).collect()
  }
}

/// Totals written onto the ticket when settlement commits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TicketSettlement {
  pub num_combinations: u64,
  /// Sum of all potential wins (total exposure), not the largest win.
  pub max_payout: f64,
  pub min_payout: f64,
  /// Combined odds of the single combination. Normal tickets only.
  #[serde(default)]
  pub total_odd: Option<f64>,
  /// Potential win of the single combination. Normal tickets only.
  #[serde(default)]
  pub potential_payout: Option<f64>,
}

impl From<&SettlementResult> for TicketSettlement {
  fn from(result: &SettlementResult) -> Self {
    Self {
      num_combinations: result.num_combinations,
      max_payout: result.total_exposure,
      min_payout: result.min_payout,
      total_odd: None,
      potential_payout: None,
    }
  }
}

/// One persisted combination row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationRecord {
  pub ticket_id: TicketId,
  pub selection_ids: Vec<SelectionId>,
  pub combination_odds: f64,
  pub stake_per_combination: f64,
  pub potential_win: f64,
  pub status: BetStatus,
  pub created_at: DateTime<Utc>,
}

impl CombinationRecord {
  /// A pending row for a freshly priced combination.
  pub fn pending(ticket_id: TicketId, combination: &Combination) -> Self {
    Self {
      ticket_id,
      selection_ids: combination.selection_ids.clone(),
      combination_odds: combination.odds,
      stake_per_combination: combination.stake,
      potential_win: combination.potential_win,
      status: BetStatus::Pending,
      created_at: Utc::now(),
    }
  }
}

// ────────────────────────────────────────────
// Traits
// ────────────────────────────────────────────

/// Trait for ticket storage providers.
#[async_trait]
pub trait TicketRepository: Send + Sync + 'static {
  /// Persist a new pending ticket and assign ticket and selection ids.
  async fn create_ticket(&self, ticket: &NewTicket) -> anyhow::Result<TicketRecord>;

  /// Load a ticket by id.
  async fn load_ticket(&self, ticket_id: TicketId) -> anyhow::Result<Option<TicketRecord>>;

  /// Load the selection snapshot of a ticket, in stored order.
  async fn load_selections(&self, ticket_id: TicketId) -> anyhow::Result<Vec<Selection>>;

  /// Open a settlement transaction for a ticket.
  async fn begin_settlement(
    &self,
    ticket_id: TicketId,
  ) -> anyhow::Result<Box<dyn SettlementTransaction>>;

  /// Load the committed combinations of a ticket.
  async fn load_combinations(&self, ticket_id: TicketId)
    -> anyhow::Result<Vec<CombinationRecord>>;

  /// Mark a ticket rejected after a failed settlement.
  async fn reject_ticket(&self, ticket_id: TicketId, reason: &str) -> anyhow::Result<()>;

  /// Check if the repository is healthy (disk space, permissions).
  async fn is_healthy(&self) -> bool;
}

/// All-or-nothing write of one ticket's settlement.
///
/// Rows inserted here stay invisible to readers until `commit` succeeds.
/// After `rollback`, or a failed `commit`, none of them are.
#[async_trait]
pub trait SettlementTransaction: Send {
  /// Stage one combination row.
  async fn insert_combination(&mut self, record: &CombinationRecord) -> anyhow::Result<()>;

  /// Publish the staged rows and write the totals onto the ticket.
  async fn commit(&mut self, settlement: &TicketSettlement) -> anyhow::Result<()>;

  /// Discard the staged rows.
  async fn rollback(&mut self) -> anyhow::Result<()>;
}
