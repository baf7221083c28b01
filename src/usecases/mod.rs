//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the service's workflows. Each use case is a self-contained
//! business operation.
//!
//! Use cases:
//! - `TicketService`: Validation, storage and settlement dispatch
//! - `SystemSettlement`: Combination expansion with transactional writes

pub mod system_settlement;
pub mod ticket_service;

pub use system_settlement::SystemSettlement;
pub use ticket_service::{TicketError, TicketService};
