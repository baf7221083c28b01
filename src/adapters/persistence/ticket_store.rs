//! Ticket Store - Atomic JSON Ticket Records
//!
//! Each ticket lives in `tickets/<id>.json`. Writes go to a temporary
//! file first and are then renamed over the final path, so a reader
//! always sees either the previous or the new version of a ticket.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::domain::ticket::{BetStatus, TicketId};
use crate::ports::repository::{NewTicket, SelectionRecord, TicketRecord};

/// JSON-file ticket store with monotonically assigned ids.
pub struct TicketStore {
    /// Directory holding `<id>.json` files.
    tickets_dir: PathBuf,
    /// Next ticket id to hand out.
    next_id: AtomicU64,
}

impl TicketStore {
    /// Open the store under `data_dir`, creating `tickets/` if needed.
    ///
    /// Id assignment resumes after the highest id already on disk.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let tickets_dir = Path::new(data_dir).join("tickets");
        fs::create_dir_all(&tickets_dir)
            .await
            .context("Failed to create tickets directory")?;

        let last_id = highest_ticket_id(&tickets_dir).await?;
        info!(
            path = %tickets_dir.display(),
            last_id,
            "Ticket store opened"
        );

        Ok(Self {
            tickets_dir,
            next_id: AtomicU64::new(last_id + 1),
        })
    }

    /// Persist a new pending ticket, assigning ticket and selection ids.
    ///
    /// Selection ids are 1-based positions within the ticket.
    #[instrument(skip(self, ticket), fields(ticket_type = %ticket.ticket_type))]
    pub async fn create(&self, ticket: &NewTicket) -> Result<TicketRecord> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let selections = ticket
            .selections
            .iter()
            .zip(1..)
            .map(|(details, selection_id)| SelectionRecord {
                id: selection_id,
                details: details.clone(),
                status: BetStatus::Pending,
            })
            .collect();

        let record = TicketRecord {
            id,
            user_id: ticket.user_id,
            total_stake: ticket.total_stake,
            ticket_type: ticket.ticket_type,
            system_combination: ticket.system_combination.clone(),
            status: BetStatus::Pending,
            created_at: Utc::now(),
            selections,
            settlement: None,
            rejection_reason: None,
        };

        self.save(&record).await?;
        Ok(record)
    }

    /// Write a ticket atomically (tmp → rename).
    pub async fn save(&self, record: &TicketRecord) -> Result<()> {
        self.stage(record).await?;
        self.publish(record.id).await
    }

    /// Write a ticket to its temporary path without publishing it.
    pub async fn stage(&self, record: &TicketRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)
            .context("Failed to serialize ticket")?;

        fs::write(self.tmp_path(record.id), &json)
            .await
            .with_context(|| format!("Failed to write tmp file for ticket {}", record.id))
    }

    /// Rename a staged ticket over its final path.
    pub async fn publish(&self, ticket_id: TicketId) -> Result<()> {
        fs::rename(self.tmp_path(ticket_id), self.path(ticket_id))
            .await
            .with_context(|| format!("Failed to publish ticket {ticket_id}"))?;

        debug!(ticket_id, "Ticket saved");
        Ok(())
    }

    /// Drop a staged ticket write, if any.
    pub async fn discard_staged(&self, ticket_id: TicketId) -> Result<()> {
        match fs::remove_file(self.tmp_path(ticket_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove staged ticket"),
        }
    }

    /// Load a ticket. Returns `None` if it does not exist.
    #[instrument(skip(self))]
    pub async fn load(&self, ticket_id: TicketId) -> Result<Option<TicketRecord>> {
        let path = self.path(ticket_id);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read ticket {ticket_id}"))?;

        let record: TicketRecord = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse ticket {ticket_id}"))?;

        Ok(Some(record))
    }

    /// Load a ticket that must exist.
    pub async fn load_existing(&self, ticket_id: TicketId) -> Result<TicketRecord> {
        self.load(ticket_id)
            .await?
            .with_context(|| format!("Ticket {ticket_id} not found"))
    }

    /// Check if the tickets directory is writable.
    pub async fn is_healthy(&self) -> bool {
        let probe = self.tickets_dir.join(".health_check");
        let result = fs::write(&probe, b"ok").await;
        let _ = fs::remove_file(&probe).await;
        result.is_ok()
    }

    fn path(&self, ticket_id: TicketId) -> PathBuf {
        self.tickets_dir.join(format!("{ticket_id}.json"))
    }

    fn tmp_path(&self, ticket_id: TicketId) -> PathBuf {
        self.tickets_dir.join(format!("{ticket_id}.json.tmp"))
    }
}

/// Highest `<id>.json` in the directory, 0 when empty.
async fn highest_ticket_id(dir: &Path) -> Result<TicketId> {
    let mut highest = 0;
    let mut entries = fs::read_dir(dir)
        .await
        .context("Failed to list tickets directory")?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let id = name
            .to_str()
            .and_then(|n| n.strip_suffix(".json"))
            .and_then(|stem| stem.parse::<TicketId>().ok());
        if let Some(id) = id {
            highest = highest.max(id);
        }
    }

    Ok(highest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticket::TicketType;
    use crate::ports::repository::NewSelection;

    fn temp_dir() -> String {
        let mut p = std::env::temp_dir();
        p.push(format!("ticket_store_test_{}", uuid::Uuid::new_v4()));
        p.to_string_lossy().to_string()
    }

    fn new_ticket(odds: &[f64]) -> NewTicket {
        NewTicket {
            user_id: 7,
            total_stake: 20.0,
            ticket_type: TicketType::Normal,
            system_combination: None,
            selections: odds
                .iter()
                .map(|&odd_value| NewSelection {
                    sport_type: "football".into(),
                    league: "Premier League".into(),
                    home_team: "Home".into(),
                    away_team: "Away".into(),
                    event_date: Utc::now(),
                    market_type: "1X2".into(),
                    selected_outcome: "1".into(),
                    odd_value,
                    stake: 20.0,
                    eid: String::new(),
                    selection_type: String::new(),
                    is_fixed: false,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_ids() {
        let dir = temp_dir();
        let store = TicketStore::new(&dir).await.unwrap();

        let first = store.create(&new_ticket(&[1.5, 2.0])).await.unwrap();
        let second = store.create(&new_ticket(&[1.1])).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        let ids: Vec<_> = first.selections.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_load_round_trip_and_missing() {
        let dir = temp_dir();
        let store = TicketStore::new(&dir).await.unwrap();
        let created = store.create(&new_ticket(&[1.5, 2.0])).await.unwrap();

        let loaded = store.load(created.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, BetStatus::Pending);
        assert_eq!(loaded.snapshot_selections()[1].odds, 2.0);

        assert!(store.load(999).await.unwrap().is_none());
        assert!(store.load_existing(999).await.is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_ids_resume_after_reopen() {
        let dir = temp_dir();
        {
            let store = TicketStore::new(&dir).await.unwrap();
            store.create(&new_ticket(&[1.5])).await.unwrap();
            store.create(&new_ticket(&[1.5])).await.unwrap();
        }

        let reopened = TicketStore::new(&dir).await.unwrap();
        let next = reopened.create(&new_ticket(&[1.5])).await.unwrap();
        assert_eq!(next.id, 3);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_staged_write_is_invisible_until_published() {
        let dir = temp_dir();
        let store = TicketStore::new(&dir).await.unwrap();
        let mut record = store.create(&new_ticket(&[1.5])).await.unwrap();

        record.status = BetStatus::Rejected;
        store.stage(&record).await.unwrap();
        assert_eq!(store.load_existing(record.id).await.unwrap().status, BetStatus::Pending);

        store.discard_staged(record.id).await.unwrap();
        store.discard_staged(record.id).await.unwrap();
        assert_eq!(store.load_existing(record.id).await.unwrap().status, BetStatus::Pending);

        store.save(&record).await.unwrap();
        assert_eq!(store.load_existing(record.id).await.unwrap().status, BetStatus::Rejected);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
