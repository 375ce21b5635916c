//! Config file discovery.
//!
//! Resolution order (first hit wins):
//! 1. an explicit path (`--config`), which must exist
//! 2. `./.grctool.yaml`
//! 3. `./grctool.yaml`
//! 4. built-in defaults
//!
//! After loading, `GRCTOOL_DATA_DIR` overrides `storage.data_dir`. The CLI's
//! `--data-dir` is applied last via [`LoadedConfig::with_data_dir`].

use std::path::{Path, PathBuf};

use crate::{ConfigError, GrcConfig, Result};

/// Environment variable that overrides `storage.data_dir`.
pub const DATA_DIR_ENV: &str = "GRCTOOL_DATA_DIR";

/// File names searched for, in order, in the working directory.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[".grctool.yaml", "grctool.yaml"];

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The loaded configuration, with `storage.data_dir` made absolute.
    pub config: GrcConfig,
    /// File the configuration came from, if any.
    pub source: Option<PathBuf>,
}

impl LoadedConfig {
    /// Resolved data directory.
    pub fn data_dir(&self) -> &Path {
        &self.config.storage.data_dir
    }

    /// Override the data directory. Relative paths resolve against `base`.
    #[must_use]
    pub fn with_data_dir(mut self, dir: &Path, base: &Path) -> Self {
        self.config.storage.data_dir = absolutize(dir, base);
        self
    }
}

/// Discover and load configuration relative to the current directory,
/// honoring `GRCTOOL_DATA_DIR`.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let cwd = std::env::current_dir().map_err(|source| ConfigError::ReadFile {
        path: ".".to_string(),
        source,
    })?;
    let env_data_dir = std::env::var_os(DATA_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    load_config_from(explicit, &cwd, env_data_dir.as_deref())
}

/// Discover and load configuration with an explicit search directory and
/// data-dir override.
///
/// A missing discovered file is not an error; defaults are used. Everything
/// else is strict.
///
/// # Errors
///
/// - `ConfigError::NotFound` if `explicit` is given and does not exist
/// - `ConfigError::ReadFile` if a file exists but cannot be read
/// - `ConfigError::Parse` for malformed YAML or unknown enum values
/// - `ConfigError::InvalidValue` for an empty `storage.data_dir`
pub fn load_config_from(
    explicit: Option<&Path>,
    search_dir: &Path,
    data_dir_override: Option<&Path>,
) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(path) => {
            let path = absolutize(path, search_dir);
            if !path.is_file() {
                return Err(ConfigError::NotFound {
                    path: path.display().to_string(),
                });
            }
            Some(path)
        }
        None => DEFAULT_CONFIG_FILES
            .iter()
            .map(|name| search_dir.join(name))
            .find(|candidate| candidate.is_file()),
    };

    let (mut config, base) = match &path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config file");
            let config = load_config_file(path)?;
            let base = path.parent().map_or_else(|| search_dir.to_path_buf(), Path::to_path_buf);
            (config, base)
        }
        None => {
            tracing::debug!(dir = %search_dir.display(), "no config file found, using defaults");
            (GrcConfig::default(), search_dir.to_path_buf())
        }
    };

    config.storage.data_dir = match data_dir_override {
        Some(dir) => {
            tracing::debug!(data_dir = %dir.display(), "data directory overridden by {}", DATA_DIR_ENV);
            absolutize(dir, search_dir)
        }
        None => absolutize(&config.storage.data_dir, &base),
    };

    Ok(LoadedConfig {
        config,
        source: path,
    })
}

/// Load config from a specific file path (no discovery).
///
/// # Errors
///
/// Returns `ConfigError::ReadFile` or any error from [`GrcConfig::from_yaml`].
pub fn load_config_file(path: &Path) -> Result<GrcConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    GrcConfig::from_yaml(&path.display().to_string(), &contents)
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
