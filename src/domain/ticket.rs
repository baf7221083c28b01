//! Ticket domain types.
//!
//! Selections, the per-run snapshot the engine reads from, and the
//! combination and settlement values it produces.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::LookupError;

// ────────────────────────────────────────────
// Identifiers
// ────────────────────────────────────────────

/// Storage-assigned selection identifier, unique within a ticket.
pub type SelectionId = u64;

/// Storage-assigned ticket identifier.
pub type TicketId = u64;

// ────────────────────────────────────────────
// Enums
// ────────────────────────────────────────────

/// How a ticket is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketType {
    /// Every selection in a single combination.
    Normal,
    /// Fixed selections plus k-subsets of free selections.
    System,
}

impl std::fmt::Display for TicketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Lifecycle status shared by tickets, selections and combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Pending,
    Won,
    Lost,
    /// Settlement failed; nothing on the ticket is billable.
    Rejected,
}

// ────────────────────────────────────────────
// Selection snapshot
// ────────────────────────────────────────────

/// One selection as the engine sees it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub id: SelectionId,
    /// Decimal odds, always > 0.
    pub odds: f64,
    /// Fixed selections appear in every combination.
    pub is_fixed: bool,
}

/// Immutable identifier → odds mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OddsBook {
    odds: HashMap<SelectionId, f64>,
}

impl OddsBook {
    /// Look up a selection's odds.
    pub fn get(&self, id: SelectionId) -> Result<f64, LookupError> {
        self.odds
            .get(&id)
            .copied()
            .ok_or(LookupError { selection_id: id })
    }

    pub fn len(&self) -> usize {
        self.odds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.odds.is_empty()
    }
}

impl FromIterator<(SelectionId, f64)> for OddsBook {
    fn from_iter<I: IntoIterator<Item = (SelectionId, f64)>>(iter: I) -> Self {
        Self {
            odds: iter.into_iter().collect(),
        }
    }
}

/// Read-only view of a ticket's selections for one settlement run.
///
/// Fixed and free identifiers keep the order they had in the source
/// sequence, which fixes the enumeration order of combinations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSnapshot {
    /// Every identifier in source order.
    stored: Vec<SelectionId>,
    fixed: Vec<SelectionId>,
    free: Vec<SelectionId>,
    odds: OddsBook,
}

impl SelectionSnapshot {
    pub fn new(selections: &[Selection]) -> Self {
        let (fixed, free): (Vec<&Selection>, Vec<&Selection>) =
            selections.iter().partition(|s| s.is_fixed);

        Self {
            stored: selections.iter().map(|s| s.id).collect(),
            fixed: fixed.iter().map(|s| s.id).collect(),
            free: free.iter().map(|s| s.id).collect(),
            odds: selections.iter().map(|s| (s.id, s.odds)).collect(),
        }
    }

    pub fn fixed(&self) -> &[SelectionId] {
        &self.fixed
    }

    pub fn free(&self) -> &[SelectionId] {
        &self.free
    }

    pub fn odds(&self) -> &OddsBook {
        &self.odds
    }

    /// Every identifier in source order, regardless of fixed flags.
    pub fn all_ids(&self) -> &[SelectionId] {
        &self.stored
    }
}

// ────────────────────────────────────────────
// Engine output
// ────────────────────────────────────────────

/// One priced combination: the fixed set plus one subset of free selections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combination {
    /// Fixed identifiers followed by the subset, both in snapshot order.
    pub selection_ids: Vec<SelectionId>,
    /// Product of the members' odds.
    pub odds: f64,
    pub stake: f64,
    /// `odds * stake`.
    pub potential_win: f64,
}

/// Aggregates written back onto the ticket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettlementResult {
    pub num_combinations: u64,
    pub stake_per_combination: f64,
    /// Sum of every combination's potential win. Stored on the ticket as
    /// `max_payout`; it is not the largest single win.
    pub total_exposure: f64,
    /// Smallest single potential win.
    pub min_payout: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(id: SelectionId, odds: f64, is_fixed: bool) -> Selection {
        Selection { id, odds, is_fixed }
    }

    #[test]
    fn test_snapshot_partitions_in_order() {
        let snapshot = SelectionSnapshot::new(&[
            sel(4, 1.5, false),
            sel(1, 1.2, true),
            sel(9, 2.0, false),
            sel(3, 1.1, true),
            sel(2, 1.8, false),
        ]);

        assert_eq!(snapshot.fixed(), &[1, 3]);
        assert_eq!(snapshot.free(), &[4, 9, 2]);
        assert_eq!(snapshot.all_ids(), &[4, 1, 9, 3, 2]);
        assert_eq!(snapshot.odds().len(), 5);
    }

    #[test]
    fn test_odds_book_lookup() {
        let book: OddsBook = [(1, 1.5), (2, 2.0)].into_iter().collect();
        assert_eq!(book.get(2), Ok(2.0));
        assert_eq!(book.get(3), Err(LookupError { selection_id: 3 }));
    }

    #[test]
    fn test_ticket_type_serde() {
        let json = serde_json::to_string(&TicketType::System).unwrap();
        assert_eq!(json, "\"system\"");
        let parsed: TicketType = serde_json::from_str("\"normal\"").unwrap();
        assert_eq!(parsed, TicketType::Normal);
    }
}
