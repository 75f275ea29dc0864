//! Kiosk configuration.
//!
//! The configuration is a JSON document; every section is optional and falls
//! back to the factory defaults, so an operator can override a single price
//! without restating the rest:
//!
//! ```json
//! {
//!   "prices": { "inflation": 25 },
//!   "serial": { "default_paths": ["/dev/ttyAMA0"] },
//!   "tire_codes": [{ "code": "195/65R15", "psi": 33 }]
//! }
//! ```

use crate::constants::{
    BAUD_RATES, DEFAULT_POSIX_PATHS, DEFAULT_PRICE_DOT_CHECK, DEFAULT_PRICE_INFLATION,
    DEFAULT_PRICE_TIRE_INFO, SETTLE_DELAY_MS,
};
use crate::{Error, Result, ServiceKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "AIRPUMP_CONFIG";

/// Prices per service, in whole local currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prices {
    pub tire_info: u32,
    pub dot_check: u32,
    pub inflation: u32,
}

impl Default for Prices {
    fn default() -> Self {
        Self {
            tire_info: DEFAULT_PRICE_TIRE_INFO,
            dot_check: DEFAULT_PRICE_DOT_CHECK,
            inflation: DEFAULT_PRICE_INFLATION,
        }
    }
}

impl Prices {
    /// Amount the customer must insert before the service proceeds.
    ///
    /// Inflation includes the PSI lookup, so its total is the sum of both.
    #[must_use]
    pub fn total_for(&self, service: ServiceKind) -> u32 {
        match service {
            ServiceKind::TireInfo => self.tire_info,
            ServiceKind::DotCheck => self.dot_check,
            ServiceKind::Inflation => self.tire_info.saturating_add(self.inflation),
        }
    }
}

/// Service toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Services {
    pub dot_check_enabled: bool,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            dot_check_enabled: true,
        }
    }
}

/// Serial link parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Paths tried before enumeration, in order.
    pub default_paths: Vec<String>,

    /// Baud rates tried for each path, in order.
    pub baud_rates: Vec<u32>,

    /// Pause after a successful open before the first write.
    pub settle_delay_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            default_paths: DEFAULT_POSIX_PATHS.iter().map(|p| p.to_string()).collect(),
            baud_rates: BAUD_RATES.to_vec(),
            settle_delay_ms: SETTLE_DELAY_MS,
        }
    }
}

impl SerialSettings {
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Operator-defined tire code with a single PSI for both axles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTireCode {
    pub code: String,
    pub psi: u32,
}

/// Complete kiosk configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    pub prices: Prices,
    pub services: Services,
    pub serial: SerialSettings,
    pub tire_codes: Vec<CustomTireCode>,

    /// SQLite transaction log location. `None` disables persistence.
    pub database_path: Option<String>,
}

impl KioskConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    /// Returns `Error::ConfigParse` for malformed JSON and `Error::Config` when
    /// the document is well-formed but unusable.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: KioskConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration from a file.
    ///
    /// # Errors
    /// Returns `Error::Io` when the file cannot be read, otherwise the same
    /// errors as [`KioskConfig::from_json`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), "Loaded kiosk configuration");
        Ok(config)
    }

    /// Load from the file named by `AIRPUMP_CONFIG`, or use the defaults when
    /// the variable is unset.
    ///
    /// # Errors
    /// Same as [`KioskConfig::load`] when the variable is set.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load(path),
            None => {
                tracing::debug!("{CONFIG_ENV_VAR} not set, using default configuration");
                Ok(Self::default())
            }
        }
    }

    /// Check invariants that serde cannot express.
    ///
    /// # Errors
    /// Returns `Error::Config` describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        if self.serial.baud_rates.is_empty() {
            return Err(Error::Config("serial.baud_rates must not be empty".into()));
        }
        if let Some(rate) = self.serial.baud_rates.iter().find(|rate| **rate == 0) {
            return Err(Error::Config(format!("invalid baud rate {rate}")));
        }
        if let Some(tire) = self.tire_codes.iter().find(|t| t.code.trim().is_empty()) {
            return Err(Error::Config(format!(
                "tire code with psi {} has an empty code",
                tire.psi
            )));
        }
        if let Some(tire) = self.tire_codes.iter().find(|t| t.psi == 0) {
            return Err(Error::Config(format!("tire code {} has zero psi", tire.code)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = KioskConfig::default();
        assert_eq!(config.prices.tire_info, 10);
        assert_eq!(config.prices.inflation, 20);
        assert!(config.services.dot_check_enabled);
        assert_eq!(config.serial.baud_rates, vec![115_200, 9_600]);
        assert_eq!(config.serial.settle_delay(), Duration::from_millis(350));
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_inflation_total_includes_tire_info() {
        let prices = Prices::default();
        assert_eq!(prices.total_for(ServiceKind::Inflation), 30);
        assert_eq!(prices.total_for(ServiceKind::TireInfo), 10);
        assert_eq!(prices.total_for(ServiceKind::DotCheck), 10);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = KioskConfig::from_json(r#"{ "prices": { "inflation": 25 } }"#).unwrap();
        assert_eq!(config.prices.inflation, 25);
        assert_eq!(config.prices.tire_info, 10);
        assert_eq!(config.serial, SerialSettings::default());
    }

    #[test]
    fn test_free_dot_check() {
        let config = KioskConfig::from_json(r#"{ "prices": { "dot_check": 0 } }"#).unwrap();
        assert_eq!(config.prices.total_for(ServiceKind::DotCheck), 0);
    }

    #[test]
    fn test_rejects_empty_baud_list() {
        let result = KioskConfig::from_json(r#"{ "serial": { "baud_rates": [] } }"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_zero_psi_tire_code() {
        let result = KioskConfig::from_json(r#"{ "tire_codes": [{ "code": "X", "psi": 0 }] }"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let result = KioskConfig::from_json("{ prices: ");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "serial": {{ "default_paths": ["/dev/ttyAMA0"] }}, "database_path": "kiosk.db" }}"#
        )
        .unwrap();

        let config = KioskConfig::load(file.path()).unwrap();
        assert_eq!(config.serial.default_paths, vec!["/dev/ttyAMA0".to_string()]);
        assert_eq!(config.database_path.as_deref(), Some("kiosk.db"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = KioskConfig::load("/nonexistent/airpump.json");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
