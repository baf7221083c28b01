//! Settlement error taxonomy.
//!
//! Every failure is fatal to the settlement run that raised it. Nothing
//! here is retried or downgraded: callers turn any of these into a
//! rejection of the ticket.

use std::num::ParseIntError;

use thiserror::Error;

use super::ticket::SelectionId;

/// Malformed combination specification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The specification was empty after trimming.
    #[error("system combination is empty")]
    Empty,

    /// A token's first slash-separated field is not a non-negative integer.
    #[error("invalid choice size in token {token:?}: {source}")]
    InvalidChoiceSize {
        token: String,
        #[source]
        source: ParseIntError,
    },
}

/// The ticket's inputs cannot produce a valid settlement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("choice size {k} exceeds the {free} free selections")]
    ChoiceSizeOutOfRange { k: usize, free: usize },

    #[error("no valid combinations calculated")]
    NoCombinations,

    #[error("combination count does not fit in 64 bits")]
    CombinationCountOverflow,

    #[error("{count} combinations exceeds the limit of {limit}")]
    TooManyCombinations { count: u64, limit: u64 },

    #[error("total stake must be positive and finite, got {0}")]
    InvalidStake(f64),
}

/// An odds value is missing for a selection in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no odds recorded for selection {selection_id}")]
pub struct LookupError {
    pub selection_id: SelectionId,
}

/// Anything that aborts a settlement run.
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Raised by the storage collaborator, passed through unchanged.
    #[error(transparent)]
    Persistence(anyhow::Error),
}

impl SettlementError {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::Configuration(_) => "configuration",
            Self::Lookup(_) => "lookup",
            Self::Persistence(_) => "persistence",
        }
    }

    /// True when the ticket itself is at fault rather than the service.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Configuration(_))
    }
}
