//! Configuration loading and validation.
//!
//! The whole run is driven by one YAML file: account descriptors, order and
//! basket specifications, the instrument catalogue, and broker connection
//! settings. Credentials support `${VAR}` / `${VAR:-default}` environment
//! variable interpolation.
//!
//! Configuration errors are fatal: the run aborts before any account work
//! starts.

mod accounts;
mod instruments;
mod orders;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use accounts::AccountConfig;
pub use instruments::{
    CommoditySection, DerivativeSeries, EquityEntry, InstrumentCatalogue, OptionEntry, OptionType,
};
pub use orders::{BasketSpec, OrderKind, OrderSpec, ProductKind, TransactionSide};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Brokerage accounts to trade on.
    pub accounts: Vec<AccountConfig>,
    /// Individual orders to place on every account.
    #[serde(default)]
    pub orders: Vec<OrderSpec>,
    /// Basket orders to place on every account.
    #[serde(default)]
    pub basket_orders: Vec<BasketSpec>,
    /// Instruments to pre-resolve and share across accounts.
    #[serde(default)]
    pub instruments: InstrumentCatalogue,
    /// Broker connection settings.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Upper bound on concurrent account tasks.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Config {
    /// Accounts with the enabled flag set.
    #[must_use]
    pub fn enabled_accounts(&self) -> Vec<AccountConfig> {
        self.accounts.iter().filter(|a| a.enabled).cloned().collect()
    }
}

/// Broker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Base URL of the brokerage REST API.
    #[serde(default = "default_broker_base_url")]
    pub base_url: String,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            base_url: default_broker_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_broker_base_url() -> String {
    "https://api.brokerage.example.com".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_workers() -> usize {
    5
}

/// Load configuration from a YAML file with environment variable
/// interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let mut result = input.to_string();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    for cap in re.captures_iter(input) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let Some(var_match) = cap.get(1) else {
            continue;
        };
        let full_match = full_match.as_str();
        let var_name = var_match.as_str();
        let default_value = cap.get(2).map(|m| m.as_str());

        let value = match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        };

        result = result.replace(full_match, &value);
    }

    result
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.accounts.iter().all(|a| !a.enabled) {
        return Err(ConfigError::ValidationError(
            "no enabled accounts configured".to_string(),
        ));
    }

    for account in config.accounts.iter().filter(|a| a.enabled) {
        if account.account_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "account with empty account_name".to_string(),
            ));
        }
        if account.user_id.trim().is_empty() || account.api_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "account '{}' has empty credentials",
                account.account_name
            )));
        }
    }

    for order in &config.orders {
        validate_order(order, &order.name)?;
    }

    for basket in &config.basket_orders {
        if basket.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "basket with empty name".to_string(),
            ));
        }
        for leg in &basket.orders {
            validate_order(leg, &format!("{}/{}", basket.name, leg.name))?;
        }
    }

    if config.max_workers == 0 {
        return Err(ConfigError::ValidationError(
            "max_workers must be at least 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_order(order: &OrderSpec, label: &str) -> Result<(), ConfigError> {
    if order.name.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "order with empty name".to_string(),
        ));
    }
    if order.instrument.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "order '{label}' has empty instrument key"
        )));
    }
    if order.quantity == 0 {
        return Err(ConfigError::ValidationError(format!(
            "order '{label}' has zero quantity"
        )));
    }
    Ok(())
}
