//! Wallet configuration

use crate::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Wallet configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Directory holding one store file per identity
    pub data_dir: PathBuf,
    /// Unit every token and proof amount is denominated in
    pub unit: String,
    /// SQLite busy timeout in milliseconds
    pub busy_timeout_ms: u64,
    /// Upper bound on fresh outputs a single receive or send may reserve
    pub max_outputs_per_operation: u32,
}

impl Default for WalletConfig {
    fn default() -> Self {
        let data_dir = ProjectDirs::from("com", "Ecash", "EcashWallet")
            .map(|dirs| dirs.data_local_dir().join("stores"))
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            data_dir,
            unit: "sat".to_string(),
            busy_timeout_ms: 5_000,
            max_outputs_per_operation: 64,
        }
    }
}

impl WalletConfig {
    /// Default configuration rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load a JSON configuration file; missing fields take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check field ranges
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(Error::Config("data_dir must not be empty".to_string()));
        }
        if self.unit.trim().is_empty() {
            return Err(Error::Config("unit must not be empty".to_string()));
        }
        if self.busy_timeout_ms == 0 {
            return Err(Error::Config("busy_timeout_ms must be positive".to_string()));
        }
        if self.max_outputs_per_operation == 0 {
            return Err(Error::Config(
                "max_outputs_per_operation must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Busy timeout as a duration
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
