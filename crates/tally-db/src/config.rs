//! Application configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                  | Default      |
//! |---------------------------|--------------|
//! | `TALLY_DB_PATH`           | `./tally.db` |
//! | `TALLY_MAX_CONNECTIONS`   | `5`          |
//! | `TALLY_DEFAULT_DUE_DAYS`  | `30`         |
//! | `TALLY_CURRENCY_SYMBOL`   | `$`          |
//! | `TALLY_CURRENCY_DECIMALS` | `2`          |
//! | `TALLY_INVOICE_PREFIX`    | `INV`        |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use tally_core::money::Money;
use tally_core::validation::MAX_DUE_DAYS;

use crate::pool::DbConfig;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Payment terms for new clients
    pub default_due_days: u32,

    /// Prefix printed before amounts, e.g. "$" or "Rs "
    pub currency_symbol: String,

    /// Minor-unit digits shown when formatting amounts
    pub currency_decimals: u32,

    /// Invoice number prefix: PREFIX-YYYY-NNNNN
    pub invoice_prefix: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            db_path: PathBuf::from("./tally.db"),
            max_connections: 5,
            default_due_days: 30,
            currency_symbol: "$".to_string(),
            currency_decimals: 2,
            invoice_prefix: "INV".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let config = AppConfig {
            db_path: lookup("TALLY_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),

            max_connections: parse_or(&lookup, "TALLY_MAX_CONNECTIONS", defaults.max_connections)?,

            default_due_days: parse_or(&lookup, "TALLY_DEFAULT_DUE_DAYS", defaults.default_due_days)?,

            currency_symbol: lookup("TALLY_CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol),

            currency_decimals: parse_or(&lookup, "TALLY_CURRENCY_DECIMALS", defaults.currency_decimals)?,

            invoice_prefix: lookup("TALLY_INVOICE_PREFIX")
                .map(|p| p.trim().to_string())
                .unwrap_or(defaults.invoice_prefix),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("TALLY_MAX_CONNECTIONS".to_string()));
        }
        if i64::from(config.default_due_days) > MAX_DUE_DAYS {
            return Err(ConfigError::InvalidValue("TALLY_DEFAULT_DUE_DAYS".to_string()));
        }
        if config.currency_decimals > 6 {
            return Err(ConfigError::InvalidValue("TALLY_CURRENCY_DECIMALS".to_string()));
        }
        if config.invoice_prefix.is_empty() {
            return Err(ConfigError::MissingRequired("TALLY_INVOICE_PREFIX".to_string()));
        }

        Ok(config)
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.db_path)
            .max_connections(self.max_connections)
            .invoice_prefix(&self.invoice_prefix)
    }

    /// Formats an amount for display, e.g. `$1,234.50` style without grouping: `$1234.50`.
    pub fn format_currency(&self, amount: Money) -> String {
        let decimals = self.currency_decimals;
        let rounded = amount
            .amount()
            .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };

        format!(
            "{sign}{}{:.prec$}",
            self.currency_symbol,
            rounded.abs(),
            prec = decimals as usize
        )
    }
}

/// Initialize the tracing subscriber for binaries.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn"));

    // Ignore the error when a subscriber is already installed (tests, embedding apps)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TALLY_DB_PATH", "/var/lib/tally/tally.db"),
            ("TALLY_MAX_CONNECTIONS", "8"),
            ("TALLY_DEFAULT_DUE_DAYS", "15"),
            ("TALLY_CURRENCY_SYMBOL", "Rs "),
            ("TALLY_INVOICE_PREFIX", "TLY"),
        ]))
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/var/lib/tally/tally.db"));
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.default_due_days, 15);
        assert_eq!(config.invoice_prefix, "TLY");

        let db = config.db_config();
        assert_eq!(db.max_connections, 8);
        assert_eq!(db.invoice_prefix, "TLY");
    }

    #[test]
    fn test_invalid_values() {
        let err = AppConfig::from_lookup(lookup(&[("TALLY_MAX_CONNECTIONS", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v) if v == "TALLY_MAX_CONNECTIONS"));

        assert!(AppConfig::from_lookup(lookup(&[("TALLY_MAX_CONNECTIONS", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("TALLY_DEFAULT_DUE_DAYS", "-3")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("TALLY_INVOICE_PREFIX", "  ")])).is_err());
    }

    #[test]
    fn test_format_currency() {
        let config = AppConfig::default();
        assert_eq!(config.format_currency(Money::new(dec!(170.1))), "$170.10");
        assert_eq!(config.format_currency(Money::new(dec!(-5.5))), "-$5.50");
        assert_eq!(config.format_currency(Money::new(dec!(0.005))), "$0.01");

        let rupees = AppConfig {
            currency_symbol: "Rs ".to_string(),
            currency_decimals: 0,
            ..AppConfig::default()
        };
        assert_eq!(rupees.format_currency(Money::new(dec!(1234.5))), "Rs 1235");
    }
}
