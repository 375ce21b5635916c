//! Configuration types.
//!
//! Every section and field is optional in the file; missing values fall back
//! to the defaults below. Values that are present must be well-formed.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrcConfig {
    /// Local storage settings.
    pub storage: StorageConfig,
    /// External GRC platform settings.
    pub tugboat: TugboatConfig,
    /// Logging defaults for the binary.
    pub logging: LoggingConfig,
}

impl GrcConfig {
    /// Parse configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed YAML or unknown enum
    /// values, and `ConfigError::InvalidValue` when [`GrcConfig::validate`]
    /// fails.
    pub fn from_yaml(source_name: &str, yaml: &str) -> Result<Self> {
        // An empty or comment-only file is a `null` document; treat it as all defaults.
        let has_content = yaml
            .lines()
            .map(str::trim)
            .any(|line| !line.is_empty() && !line.starts_with('#'));
        if !has_content {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: source_name.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an empty `storage.data_dir`.
    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "storage.data_dir".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Local storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for evidence, docs and cached data. Relative values
    /// are resolved against the config file's directory.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Connection settings for the external GRC platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TugboatConfig {
    /// API base URL.
    pub base_url: String,
    /// Organization identifier.
    pub org_id: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Requests per second.
    pub rate_limit: u32,
    /// How credentials are captured.
    pub auth_mode: AuthMode,
}

impl Default for TugboatConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            org_id: String::new(),
            timeout_secs: 30,
            rate_limit: 10,
            auth_mode: AuthMode::default(),
        }
    }
}

/// Credential capture mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Username/password form.
    Form,
    /// Interactive browser login.
    #[default]
    Browser,
}

/// Logging defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}
