//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    name = %config.service.name,
    max_combinations = config.settlement.max_combinations,
    data_dir = %config.persistence.data_dir,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Parseable bind addresses
/// - A positive combination bound
/// - Non-empty storage directory
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    !config.service.name.is_empty(),
    "Service name must not be empty"
  );

  // Bind addresses
  config
    .api
    .bind_address
    .parse::<SocketAddr>()
    .with_context(|| format!("Invalid api.bind_address: {}", config.api.bind_address))?;

  if config.metrics.enabled {
    config
      .metrics
      .bind_address
      .parse::<SocketAddr>()
      .with_context(|| {
        format!("Invalid metrics.bind_address: {}", config.metrics.bind_address)
      })?;
  }

  anyhow::ensure!(
    config.metrics.health_port > 0,
    "metrics.health_port must be non-zero"
  );

  // Settlement validation
  anyhow::ensure!(
    config.settlement.max_combinations > 0,
    "settlement.max_combinations must be positive, got {}",
    config.settlement.max_combinations
  );

  // Persistence validation
  anyhow::ensure!(
    !config.persistence.data_dir.is_empty(),
    "persistence.data_dir must not be empty"
  );
  anyhow::ensure!(
    config.persistence.health_check_interval_seconds > 0,
    "persistence.health_check_interval_seconds must be positive"
  );

  Ok(())
}
