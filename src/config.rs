// Configuration for the tooling around the ledger

use crate::units::{DEFAULT_DECIMALS, MAX_DECIMALS};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Display and logging settings for the harness and CLI
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BankConfig {
    /// Decimal places between the major unit and the ledger's integer unit
    pub decimals: u8,
    /// Symbol printed after major-unit amounts
    pub symbol: String,
    /// Default tracing filter when RUST_LOG is not set
    pub log_filter: String,
}

impl BankConfig {
    /// Create a new config with builder pattern
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_symbol(mut self, symbol: &str) -> Self {
        self.symbol = symbol.to_string();
        self
    }

    pub fn with_log_filter(mut self, filter: &str) -> Self {
        self.log_filter = filter.to_string();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.decimals > MAX_DECIMALS {
            return Err(ConfigError::Invalid(format!(
                "decimals must be <= {}, got {}",
                MAX_DECIMALS, self.decimals
            )));
        }
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("symbol must not be empty".to_string()));
        }
        Ok(())
    }
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_DECIMALS,
            symbol: "ETH".to_string(),
            log_filter: "info".to_string(),
        }
    }
}
