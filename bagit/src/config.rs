//! Configuration management for bag tooling.
//!
//! Loads configuration from a TOML file; every section and field is optional.

use crate::bag::Version;
use crate::bagger::BagOptions;
use crate::checksum::{Algorithm, READ_BUFFER};
use crate::utils::{BagError, IoContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub bag: BagConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BagConfig {
    /// Checksum algorithm for new manifests
    #[serde(default = "default_checksum_algorithm")]
    pub checksum_algorithm: Algorithm,

    /// Read block size in bytes when hashing (default: 1MB, minimum 1MB)
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,

    /// BagIt version written to bagit.txt
    #[serde(default)]
    pub version: Version,
}

// Default values
fn default_log_level() -> String {
    "info".to_string()
}

fn default_checksum_algorithm() -> Algorithm {
    Algorithm::Md5
}

fn default_read_buffer_size() -> usize {
    READ_BUFFER
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for BagConfig {
    fn default() -> Self {
        Self {
            checksum_algorithm: default_checksum_algorithm(),
            read_buffer_size: default_read_buffer_size(),
            version: Version::default(),
        }
    }
}

impl BagConfig {
    /// Bagging options for this configuration.
    pub fn bag_options(&self, dry_run: bool) -> BagOptions {
        BagOptions {
            algorithm: self.checksum_algorithm,
            version: self.version,
            read_buffer_size: self.read_buffer_size,
            dry_run,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).at(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML configuration text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| BagError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.bag.read_buffer_size < READ_BUFFER {
            return Err(BagError::Config(format!(
                "read_buffer_size must be at least {} bytes, got {}",
                READ_BUFFER, self.bag.read_buffer_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() -> Result<()> {
        let config = Config::from_toml("")?;
        assert_eq!(config.log.level, "info");
        assert_eq!(config.bag.checksum_algorithm, Algorithm::Md5);
        assert_eq!(config.bag.read_buffer_size, READ_BUFFER);
        assert_eq!(config.bag.version, Version::new(0, 97));
        Ok(())
    }

    #[test]
    fn test_full_config() -> Result<()> {
        let config = Config::from_toml(
            r#"
            [log]
            level = "debug"

            [bag]
            checksum_algorithm = "sha512"
            read_buffer_size = 4194304
            version = "1.0"
            "#,
        )?;
        assert_eq!(config.log.level, "debug");

        let options = config.bag.bag_options(true);
        assert_eq!(options.algorithm, Algorithm::Sha512);
        assert_eq!(options.read_buffer_size, 4 * 1024 * 1024);
        assert_eq!(options.version, Version::new(1, 0));
        assert!(options.dry_run);
        Ok(())
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let err = Config::from_toml("[bag]\nchecksum_algorithm = \"crc32\"\n").unwrap_err();
        assert!(matches!(err, BagError::Config(msg) if msg.contains("crc32")));
    }

    #[test]
    fn test_small_read_buffer_rejected() {
        let err = Config::from_toml("[bag]\nread_buffer_size = 4096\n").unwrap_err();
        assert!(matches!(err, BagError::Config(_)));
    }
}
