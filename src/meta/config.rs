//! Meta pool configuration
//!
//! ```toml
//! context_capacity = 1024
//! clock_interval_ms = 16
//! ```

use super::clock::DEFAULT_CLOCK_INTERVAL;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default number of context struct signatures kept across batches
pub const DEFAULT_CONTEXT_CAPACITY: usize = 1024;

/// Meta pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetaPoolConfig {
    /// Maximum context entries kept across a batch boundary
    pub context_capacity: usize,
    /// Coarse clock refresh interval in milliseconds
    pub clock_interval_ms: u64,
}

impl Default for MetaPoolConfig {
    fn default() -> Self {
        Self {
            context_capacity: DEFAULT_CONTEXT_CAPACITY,
            clock_interval_ms: DEFAULT_CLOCK_INTERVAL.as_millis() as u64,
        }
    }
}

impl MetaPoolConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| Error::InvalidConfiguration(format!("Malformed meta pool config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self)
            .map_err(|e| Error::InvalidConfiguration(format!("Failed to serialize config: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.context_capacity == 0 {
            return Err(Error::InvalidConfiguration(
                "context_capacity must be a positive integer".to_string(),
            ));
        }
        if self.clock_interval_ms == 0 {
            return Err(Error::InvalidConfiguration(
                "clock_interval_ms must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    pub fn clock_interval(&self) -> Duration {
        Duration::from_millis(self.clock_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MetaPoolConfig::default();
        assert_eq!(config.context_capacity, 1024);
        assert_eq!(config.clock_interval(), Duration::from_millis(16));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() -> Result<()> {
        let config = MetaPoolConfig::from_toml_str("context_capacity = 8\n")?;
        assert_eq!(config.context_capacity, 8);
        assert_eq!(config.clock_interval_ms, 16);

        let config = MetaPoolConfig::from_toml_str("")?;
        assert_eq!(config, MetaPoolConfig::default());
        Ok(())
    }

    #[test]
    fn test_rejects_zero_and_negative() {
        for source in [
            "context_capacity = 0",
            "context_capacity = -4",
            "clock_interval_ms = 0",
            "unknown_key = 1",
        ] {
            let err = MetaPoolConfig::from_toml_str(source).unwrap_err();
            assert!(
                matches!(err, Error::InvalidConfiguration(_)),
                "{} should be rejected",
                source
            );
        }
    }

    #[test]
    fn test_toml_round_trip() -> Result<()> {
        let config = MetaPoolConfig {
            context_capacity: 64,
            clock_interval_ms: 4,
        };
        let parsed = MetaPoolConfig::from_toml_str(&config.to_toml_string()?)?;
        assert_eq!(parsed, config);
        Ok(())
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join(format!("canoe_missing_{}.toml", std::process::id()));
        let err = MetaPoolConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_load_file() -> Result<()> {
        let path = std::env::temp_dir().join(format!("canoe_config_{}.toml", std::process::id()));
        std::fs::write(&path, "context_capacity = 32\nclock_interval_ms = 8\n")
            .map_err(|e| Error::Io(e.to_string()))?;

        let config = MetaPoolConfig::load(&path)?;
        assert_eq!(config.context_capacity, 32);
        assert_eq!(config.clock_interval_ms, 8);

        // Cleanup
        std::fs::remove_file(path).ok();
        Ok(())
    }
}
