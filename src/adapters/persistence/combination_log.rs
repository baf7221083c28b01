//! Combination Log - JSONL Combination Rows
//!
//! Each ticket's combinations are stored one JSON object per line in
//! `combinations/<id>.jsonl`. A settlement stages its rows in
//! `<id>.jsonl.tmp` and publishes them with a single rename, so readers
//! never observe a partially settled ticket.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use crate::domain::ticket::TicketId;
use crate::ports::repository::CombinationRecord;

/// JSONL combination storage, one file per ticket.
pub struct CombinationLog {
    /// Directory holding `<id>.jsonl` files.
    combinations_dir: PathBuf,
}

impl CombinationLog {
    /// Open the log under `data_dir`, creating `combinations/` if needed.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let combinations_dir = Path::new(data_dir).join("combinations");
        fs::create_dir_all(&combinations_dir)
            .await
            .context("Failed to create combinations directory")?;

        Ok(Self { combinations_dir })
    }

    /// Start staging rows for a ticket, truncating any stale staging file.
    #[instrument(skip(self))]
    pub async fn begin(&self, ticket_id: TicketId) -> Result<StagedCombinations> {
        let staging_path = self.staging_path(ticket_id);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&staging_path)
            .await
            .with_context(|| format!("Failed to open staging file for ticket {ticket_id}"))?;

        Ok(StagedCombinations {
            ticket_id,
            writer: Some(BufWriter::new(file)),
            staging_path,
            committed_path: self.committed_path(ticket_id),
            rows: 0,
        })
    }

    /// Load the committed rows of a ticket, in insertion order.
    #[instrument(skip(self))]
    pub async fn load(&self, ticket_id: TicketId) -> Result<Vec<CombinationRecord>> {
        let path = self.committed_path(ticket_id);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read combinations of ticket {ticket_id}"))?;

        let mut records = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<CombinationRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        file = %path.display(),
                        error = %e,
                        "Skipping malformed combination record"
                    );
                }
            }
        }

        debug!(ticket_id, count = records.len(), "Loaded combination records");
        Ok(records)
    }

    /// Delete a ticket's committed rows, if any.
    pub async fn remove(&self, ticket_id: TicketId) -> Result<()> {
        match fs::remove_file(self.committed_path(ticket_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove combinations file"),
        }
    }

    /// Check if the combinations directory is writable.
    pub async fn is_healthy(&self) -> bool {
        let probe = self.combinations_dir.join(".health_check");
        let result = fs::write(&probe, b"ok").await;
        let _ = fs::remove_file(&probe).await;
        result.is_ok()
    }

    fn committed_path(&self, ticket_id: TicketId) -> PathBuf {
        self.combinations_dir.join(format!("{ticket_id}.jsonl"))
    }

    fn staging_path(&self, ticket_id: TicketId) -> PathBuf {
        self.combinations_dir.join(format!("{ticket_id}.jsonl.tmp"))
    }
}

/// Rows staged for one ticket, not yet visible to readers.
pub struct StagedCombinations {
    ticket_id: TicketId,
    /// `None` once published or discarded.
    writer: Option<BufWriter<File>>,
    staging_path: PathBuf,
    committed_path: PathBuf,
    rows: u64,
}

impl StagedCombinations {
    /// Append one row to the staging file.
    pub async fn append(&mut self, record: &CombinationRecord) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .context("Staged combinations already closed")?;

        let mut json = serde_json::to_string(record)
            .context("Failed to serialize combination record")?;
        json.push('\n');

        writer
            .write_all(json.as_bytes())
            .await
            .context("Failed to write combination record")?;

        self.rows += 1;
        Ok(())
    }

    /// Rows appended so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush the staging file to disk and rename it into place.
    pub async fn publish(&mut self) -> Result<()> {
        let mut writer = self
            .writer
            .take()
            .context("Staged combinations already closed")?;

        writer.flush().await.context("Failed to flush combinations")?;
        writer
            .get_mut()
            .sync_all()
            .await
            .context("Failed to sync combinations")?;
        drop(writer);

        fs::rename(&self.staging_path, &self.committed_path)
            .await
            .context("Failed to publish combinations")?;

        info!(
            ticket_id = self.ticket_id,
            rows = self.rows,
            "Combinations published"
        );
        Ok(())
    }

    /// Close and delete the staging file.
    pub async fn discard(&mut self) -> Result<()> {
        drop(self.writer.take());

        match fs::remove_file(&self.staging_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).context("Failed to remove staging file"),
        }

        debug!(ticket_id = self.ticket_id, rows = self.rows, "Staged combinations discarded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticket::Combination;

    fn temp_dir() -> String {
        let mut p = std::env::temp_dir();
        p.push(format!("combination_log_test_{}", uuid::Uuid::new_v4()));
        p.to_string_lossy().to_string()
    }

    fn record(ticket_id: TicketId, ids: Vec<u64>, odds: f64) -> CombinationRecord {
        CombinationRecord::pending(
            ticket_id,
            &Combination {
                selection_ids: ids,
                odds,
                stake: 10.0,
                potential_win: odds * 10.0,
            },
        )
    }

    #[tokio::test]
    async fn test_rows_invisible_until_published() {
        let dir = temp_dir();
        let log = CombinationLog::new(&dir).await.unwrap();

        let mut staged = log.begin(1).await.unwrap();
        staged.append(&record(1, vec![1, 2], 3.0)).await.unwrap();
        staged.append(&record(1, vec![1, 3], 2.7)).await.unwrap();
        assert_eq!(staged.rows(), 2);
        assert!(log.load(1).await.unwrap().is_empty());

        staged.publish().await.unwrap();
        let rows = log.load(1).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].selection_ids, vec![1, 3]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_discard_leaves_nothing() {
        let dir = temp_dir();
        let log = CombinationLog::new(&dir).await.unwrap();

        let mut staged = log.begin(4).await.unwrap();
        staged.append(&record(4, vec![1], 1.5)).await.unwrap();
        staged.discard().await.unwrap();

        assert!(log.load(4).await.unwrap().is_empty());
        assert!(!Path::new(&dir).join("combinations/4.jsonl.tmp").exists());
        assert!(staged.append(&record(4, vec![2], 1.5)).await.is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let dir = temp_dir();
        let log = CombinationLog::new(&dir).await.unwrap();

        let mut staged = log.begin(2).await.unwrap();
        staged.append(&record(2, vec![5], 2.0)).await.unwrap();
        staged.publish().await.unwrap();

        let path = Path::new(&dir).join("combinations/2.jsonl");
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("not json\n\n");
        std::fs::write(&path, content).unwrap();

        assert_eq!(log.load(2).await.unwrap().len(), 1);

        log.remove(2).await.unwrap();
        assert!(log.load(2).await.unwrap().is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
