//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (file I/O, HTTP servers, Prometheus).
//! Each sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `http`: Ticket intake API (axum)
//! - `metrics`: Prometheus metrics export and health checks
//! - `persistence`: JSON ticket store and JSONL combination log

pub mod http;
pub mod metrics;
pub mod persistence;
