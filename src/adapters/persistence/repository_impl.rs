//! Repository Implementation - Concrete Adapter for the Repository Port
//!
//! Wraps `TicketStore` (atomic JSON tickets) and `CombinationLog` (JSONL
//! combination rows) into a single struct that implements the
//! `TicketRepository` trait from `crate::ports::repository`.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use super::combination_log::{CombinationLog, StagedCombinations};
use super::ticket_store::TicketStore;
use crate::domain::ticket::{BetStatus, Selection, TicketId};
use crate::ports::repository::{
    CombinationRecord, NewTicket, SettlementTransaction, TicketRecord, TicketRepository,
    TicketSettlement,
};

/// Concrete repository adapter combining ticket and combination storage.
pub struct RepositoryImpl {
    tickets: Arc<TicketStore>,
    combinations: Arc<CombinationLog>,
}

impl RepositoryImpl {
    /// Create a new repository from existing store and log instances.
    pub fn new(tickets: TicketStore, combinations: CombinationLog) -> Self {
        Self {
            tickets: Arc::new(tickets),
            combinations: Arc::new(combinations),
        }
    }

    /// Create a new repository with a data directory path.
    pub async fn from_data_dir(data_dir: &str) -> Result<Self> {
        let tickets = TicketStore::new(data_dir).await?;
        let combinations = CombinationLog::new(data_dir).await?;
        Ok(Self::new(tickets, combinations))
    }
}

#[async_trait]
impl TicketRepository for RepositoryImpl {
    async fn create_ticket(&self, ticket: &NewTicket) -> Result<TicketRecord> {
        self.tickets.create(ticket).await
    }

    async fn load_ticket(&self, ticket_id: TicketId) -> Result<Option<TicketRecord>> {
        self.tickets.load(ticket_id).await
    }

    async fn load_selections(&self, ticket_id: TicketId) -> Result<Vec<Selection>> {
        let ticket = self.tickets.load_existing(ticket_id).await?;
        Ok(ticket.snapshot_selections())
    }

    async fn begin_settlement(
        &self,
        ticket_id: TicketId,
    ) -> Result<Box<dyn SettlementTransaction>> {
        let staged = self.combinations.begin(ticket_id).await?;
        Ok(Box::new(FileSettlementTx {
            ticket_id,
            staged,
            tickets: Arc::clone(&self.tickets),
            combinations: Arc::clone(&self.combinations),
        }))
    }

    async fn load_combinations(&self, ticket_id: TicketId) -> Result<Vec<CombinationRecord>> {
        self.combinations.load(ticket_id).await
    }

    async fn reject_ticket(&self, ticket_id: TicketId, reason: &str) -> Result<()> {
        let mut ticket = self.tickets.load_existing(ticket_id).await?;
        ticket.status = BetStatus::Rejected;
        ticket.rejection_reason = Some(reason.to_string());
        self.tickets.save(&ticket).await?;

        info!(ticket_id, reason, "Ticket rejected");
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        self.tickets.is_healthy().await && self.combinations.is_healthy().await
    }
}

/// File-backed settlement transaction.
///
/// Commit order: stage the updated ticket, publish the combination rows,
/// publish the ticket. A failure before the rows are published discards
/// both staging files; if the last step fails the published rows are
/// removed again.
struct FileSettlementTx {
    ticket_id: TicketId,
    staged: StagedCombinations,
    tickets: Arc<TicketStore>,
    combinations: Arc<CombinationLog>,
}

#[async_trait]
impl SettlementTransaction for FileSettlementTx {
    async fn insert_combination(&mut self, record: &CombinationRecord) -> Result<()> {
        self.staged.append(record).await
    }

    async fn commit(&mut self, settlement: &TicketSettlement) -> Result<()> {
        if let Err(e) = self.stage_ticket(settlement).await {
            self.abandon().await;
            return Err(e);
        }

        if let Err(e) = self.staged.publish().await {
            self.abandon().await;
            return Err(e);
        }

        if let Err(e) = self.tickets.publish(self.ticket_id).await {
            warn!(
                ticket_id = self.ticket_id,
                error = %e,
                "Ticket publish failed, withdrawing combinations"
            );
            if let Err(cleanup) = self.combinations.remove(self.ticket_id).await {
                warn!(ticket_id = self.ticket_id, error = %cleanup, "Failed to withdraw combinations");
            }
            return Err(e.context("Settlement commit failed"));
        }

        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.staged.discard().await
    }
}

impl FileSettlementTx {
    async fn stage_ticket(&self, settlement: &TicketSettlement) -> Result<()> {
        let mut ticket = self.tickets.load_existing(self.ticket_id).await?;
        ticket.settlement = Some(*settlement);
        self.tickets.stage(&ticket).await
    }

    /// Drop both staging files after a commit that never published.
    async fn abandon(&mut self) {
        if let Err(e) = self.staged.discard().await {
            warn!(ticket_id = self.ticket_id, error = %e, "Failed to discard staged combinations");
        }
        if let Err(e) = self.tickets.discard_staged(self.ticket_id).await {
            warn!(ticket_id = self.ticket_id, error = %e, "Failed to discard staged ticket");
        }
    }
}
