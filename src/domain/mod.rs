//! Domain layer - System ticket settlement engine.
//!
//! Pure, synchronous logic: parse the combination specification, count
//! and enumerate free-selection subsets, price each combination and
//! aggregate exposure. No I/O happens here; persistence is reached only
//! through the callback or iterator handed to the caller.

pub mod binomial;
pub mod error;
pub mod exposure;
pub mod pricing;
pub mod subsets;
pub mod system_spec;
pub mod ticket;

// Re-export core types for convenience
pub use binomial::{binom, checked_binom};
pub use error::{ConfigurationError, LookupError, ParseError, SettlementError};
pub use exposure::{settle, settle_single, ExposureTracker, SettlementPlan};
pub use system_spec::SystemSpec;
pub use ticket::{
    BetStatus, Combination, OddsBook, Selection, SelectionId, SelectionSnapshot,
    SettlementResult, TicketId, TicketType,
};
