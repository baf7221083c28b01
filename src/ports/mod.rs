//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the domain/usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `TicketRepository`: Ticket, selection and combination storage
//! - `SettlementTransaction`: All-or-nothing settlement writes

pub mod repository;

pub use repository::{SettlementTransaction, TicketRepository};
