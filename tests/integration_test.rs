//! Integration Tests - Settlement Use Cases against the Repository Port
//!
//! Tests the interaction between usecases, ports, and adapters.
//! Uses mockall for trait mocking and tokio::test for async tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use mockall::mock;
use mockall::predicate::*;

use system_ticket_engine::adapters::persistence::RepositoryImpl;
use system_ticket_engine::config::SettlementConfig;
use system_ticket_engine::domain::{
    BetStatus, ConfigurationError, Selection, SettlementError, TicketType,
};
use system_ticket_engine::ports::repository::{
    CombinationRecord, NewSelection, NewTicket, SettlementTransaction, TicketRecord,
    TicketRepository, TicketSettlement,
};
use system_ticket_engine::usecases::{SystemSettlement, TicketError, TicketService};

// ---- Mock Definitions ----

mock! {
    pub Repo {}

    #[async_trait::async_trait]
    impl TicketRepository for Repo {
        async fn create_ticket(&self, ticket: &NewTicket) -> anyhow::Result<TicketRecord>;
        async fn load_ticket(&self, ticket_id: u64) -> anyhow::Result<Option<TicketRecord>>;
        async fn load_selections(&self, ticket_id: u64) -> anyhow::Result<Vec<Selection>>;
        async fn begin_settlement(
            &self,
            ticket_id: u64,
        ) -> anyhow::Result<Box<dyn SettlementTransaction>>;
        async fn load_combinations(&self, ticket_id: u64)
            -> anyhow::Result<Vec<CombinationRecord>>;
        async fn reject_ticket(&self, ticket_id: u64, reason: &str) -> anyhow::Result<()>;
        async fn is_healthy(&self) -> bool;
    }
}

mock! {
    pub Tx {}

    #[async_trait::async_trait]
    impl SettlementTransaction for Tx {
        async fn insert_combination(&mut self, record: &CombinationRecord) -> anyhow::Result<()>;
        async fn commit(&mut self, settlement: &TicketSettlement) -> anyhow::Result<()>;
        async fn rollback(&mut self) -> anyhow::Result<()>;
    }
}

// ---- Fixtures ----

fn free(id: u64, odds: f64) -> Selection {
    Selection { id, odds, is_fixed: false }
}

fn three_free() -> Vec<Selection> {
    vec![free(1, 1.5), free(2, 2.0), free(3, 1.8)]
}

fn stored_ticket(id: u64, spec: &str) -> TicketRecord {
    TicketRecord {
        id,
        user_id: 1,
        total_stake: 30.0,
        ticket_type: TicketType::System,
        system_combination: Some(spec.to_string()),
        status: BetStatus::Pending,
        created_at: Utc::now(),
        selections: Vec::new(),
        settlement: None,
        rejection_reason: None,
    }
}

fn new_selection(odd_value: f64, is_fixed: bool) -> NewSelection {
    NewSelection {
        sport_type: "football".into(),
        league: "La Liga".into(),
        home_team: "Home".into(),
        away_team: "Away".into(),
        event_date: Utc::now(),
        market_type: "1X2".into(),
        selected_outcome: "X".into(),
        odd_value,
        stake: 50.0,
        eid: String::new(),
        selection_type: String::new(),
        is_fixed,
    }
}

fn temp_dir() -> String {
    let mut p = std::env::temp_dir();
    p.push(format!("integration_test_{}", uuid::Uuid::new_v4()));
    p.to_string_lossy().to_string()
}

// ---- Integration Tests ----

#[tokio::test]
async fn test_persistence_failure_stops_enumeration_and_rolls_back() {
    let inserts = Arc::new(AtomicUsize::new(0));

    let mut tx = MockTx::new();
    let counter = Arc::clone(&inserts);
    tx.expect_insert_combination().times(2).returning(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(())
        } else {
            Err(anyhow::anyhow!("disk full"))
        }
    });
    tx.expect_commit().times(0);
    tx.expect_rollback().times(1).returning(|| Ok(()));

    let mut repo = MockRepo::new();
    repo.expect_load_selections()
        .with(eq(1))
        .returning(|_| Ok(three_free()));
    let mut tx = Some(tx);
    repo.expect_begin_settlement().times(1).returning(move |_| {
        let tx = tx.take().ok_or_else(|| anyhow::anyhow!("transaction already opened"))?;
        Ok(Box::new(tx) as Box<dyn SettlementTransaction>)
    });

    let usecase = SystemSettlement::new(Arc::new(repo), 1_000);
    let err = usecase.settle(1, 30.0, "2").await.unwrap_err();

    assert!(matches!(err, SettlementError::Persistence(_)));
    assert_eq!(err.to_string(), "disk full");
    assert_eq!(inserts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_oversized_choice_never_opens_transaction() {
    let mut repo = MockRepo::new();
    repo.expect_create_ticket()
        .returning(|_| Ok(stored_ticket(9, "5")));
    repo.expect_load_selections().returning(|_| {
        Ok(vec![free(1, 1.5), free(2, 2.0), free(3, 1.8), free(4, 2.2)])
    });
    repo.expect_begin_settlement().times(0);
    repo.expect_reject_ticket()
        .with(eq(9), function(|reason: &str| reason.contains("choice size 5")))
        .times(1)
        .returning(|_, _| Ok(()));

    let service = TicketService::new(Arc::new(repo), &SettlementConfig::default());
    let submission = NewTicket {
        user_id: 1,
        total_stake: 30.0,
        ticket_type: TicketType::System,
        system_combination: Some("5".into()),
        selections: vec![new_selection(1.5, false)],
    };

    let err = service.process_ticket(&submission).await.unwrap_err();
    assert!(matches!(
        err,
        TicketError::Settlement(SettlementError::Configuration(
            ConfigurationError::ChoiceSizeOutOfRange { k: 5, free: 4 }
        ))
    ));
}

#[tokio::test]
async fn test_commit_failure_rolls_back_and_rejects_ticket() {
    let mut tx = MockTx::new();
    tx.expect_insert_combination().times(3).returning(|_| Ok(()));
    tx.expect_commit()
        .withf(|s: &TicketSettlement| s.num_combinations == 3 && (s.max_payout - 93.0).abs() < 1e-9)
        .times(1)
        .returning(|_| Err(anyhow::anyhow!("rename failed")));
    tx.expect_rollback().times(1).returning(|| Ok(()));

    let mut repo = MockRepo::new();
    repo.expect_create_ticket()
        .returning(|_| Ok(stored_ticket(4, "2")));
    repo.expect_load_selections().returning(|_| Ok(three_free()));
    let mut tx = Some(tx);
    repo.expect_begin_settlement().returning(move |_| {
        let tx = tx.take().ok_or_else(|| anyhow::anyhow!("transaction already opened"))?;
        Ok(Box::new(tx) as Box<dyn SettlementTransaction>)
    });
    repo.expect_reject_ticket()
        .with(eq(4), always())
        .times(1)
        .returning(|_, _| Ok(()));

    let service = TicketService::new(Arc::new(repo), &SettlementConfig::default());
    let submission = NewTicket {
        user_id: 1,
        total_stake: 30.0,
        ticket_type: TicketType::System,
        system_combination: Some("2".into()),
        selections: vec![new_selection(1.5, false)],
    };

    let err = service.process_ticket(&submission).await.unwrap_err();
    assert_eq!(err.kind(), "persistence");
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn test_invalid_submission_is_not_stored() {
    let mut repo = MockRepo::new();
    repo.expect_create_ticket().times(0);

    let service = TicketService::new(Arc::new(repo), &SettlementConfig::default());
    let submission = NewTicket {
        user_id: 1,
        total_stake: -5.0,
        ticket_type: TicketType::Normal,
        system_combination: None,
        selections: vec![new_selection(1.5, false)],
    };

    let err = service.process_ticket(&submission).await.unwrap_err();
    assert!(matches!(err, TicketError::Validation(_)));
}

#[tokio::test]
async fn test_fixed_plus_two_sizes_end_to_end() {
    let dir = temp_dir();
    let repo = Arc::new(RepositoryImpl::from_data_dir(&dir).await.unwrap());
    let service = TicketService::new(Arc::clone(&repo), &SettlementConfig::default());

    let submission = NewTicket {
        user_id: 5,
        total_stake: 100.0,
        ticket_type: TicketType::System,
        system_combination: Some("2/4,3/4".into()),
        selections: vec![
            new_selection(1.2, true),
            new_selection(1.5, false),
            new_selection(2.0, false),
            new_selection(1.8, false),
            new_selection(2.5, false),
        ],
    };

    let id = service.process_ticket(&submission).await.unwrap();
    let rows = repo.load_combinations(id).await.unwrap();
    assert_eq!(rows.len(), 10);
    assert!(rows.iter().all(|r| r.selection_ids[0] == 1));
    assert_eq!(rows.iter().filter(|r| r.selection_ids.len() == 3).count(), 6);
    assert_eq!(rows.iter().filter(|r| r.selection_ids.len() == 4).count(), 4);
    assert!(rows.iter().all(|r| (r.stake_per_combination - 10.0).abs() < 1e-9));

    let ticket = repo.load_ticket(id).await.unwrap().unwrap();
    let settlement = ticket.settlement.unwrap();
    let sum: f64 = rows.iter().map(|r| r.potential_win).sum();
    let min = rows.iter().map(|r| r.potential_win).fold(f64::INFINITY, f64::min);
    assert_eq!(settlement.num_combinations, 10);
    assert!((settlement.max_payout - sum).abs() < 1e-9);
    assert!((settlement.min_payout - min).abs() < 1e-9);
    assert_eq!(ticket.status, BetStatus::Pending);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_concurrent_tickets_settle_independently() {
    let dir = temp_dir();
    let repo = Arc::new(RepositoryImpl::from_data_dir(&dir).await.unwrap());
    let service = Arc::new(TicketService::new(Arc::clone(&repo), &SettlementConfig::default()));

    let mut handles = Vec::new();
    for n in 2..=5usize {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            let submission = NewTicket {
                user_id: n as u64,
                total_stake: 60.0,
                ticket_type: TicketType::System,
                system_combination: Some("2".into()),
                selections: (0..n).map(|i| new_selection(1.5 + i as f64 / 10.0, false)).collect(),
            };
            (n, service.process_ticket(&submission).await.unwrap())
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let (n, id) = handle.await.unwrap();
        let rows = repo.load_combinations(id).await.unwrap();
        assert_eq!(rows.len(), n * (n - 1) / 2);
        ids.push(id);
    }

    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4);

    let _ = std::fs::remove_dir_all(&dir);
}
