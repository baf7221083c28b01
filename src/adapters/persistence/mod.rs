//! Persistence Adapters - File-based Ticket Storage
//!
//! Implements the `TicketRepository` port using atomic JSON files for
//! tickets and JSONL files for combination rows.
//! No database dependency: settlement atomicity comes from
//! write-to-tmp-then-rename.

pub mod combination_log;
pub mod repository_impl;
pub mod ticket_store;

pub use combination_log::CombinationLog;
pub use repository_impl::RepositoryImpl;
pub use ticket_store::TicketStore;
