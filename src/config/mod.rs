//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`.
//! Bind addresses, storage location and the combination bound are
//! externalized here - nothing is hardcoded in the domain layer.

pub mod loader;

use serde::Deserialize;

/// Top-level service configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the service accepts tickets.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity and logging.
  pub service: ServiceConfig,
  /// Ticket intake HTTP API.
  pub api: ApiConfig,
  /// Settlement engine limits.
  #[serde(default)]
  pub settlement: SettlementConfig,
  /// Metrics and monitoring.
  pub metrics: MetricsConfig,
  /// Persistence configuration.
  pub persistence: PersistenceConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// Ticket intake API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Intake server bind address.
  #[serde(default = "default_api_addr")]
  pub bind_address: String,
}

/// Settlement limits.
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
  /// Upper bound on combinations per system ticket. Larger tickets are
  /// rejected before any row is written.
  #[serde(default = "default_max_combinations")]
  pub max_combinations: u64,
}

impl Default for SettlementConfig {
  fn default() -> Self {
    Self {
      max_combinations: default_max_combinations(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Directory holding `tickets/` and `combinations/`.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
  /// Storage health probe interval (seconds).
  #[serde(default = "default_health_interval")]
  pub health_check_interval_seconds: u64,
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_api_addr() -> String {
  "0.0.0.0:8080".to_string()
}

fn default_max_combinations() -> u64 {
  100_000
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
  8081
}

fn default_data_dir() -> String {
  "data".to_string()
}

fn default_health_interval() -> u64 {
  15
}
