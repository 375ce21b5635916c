//! Configuration for grctool.
//!
//! Read-only YAML configuration with:
//! - `storage`: the data directory every path-safe parameter is confined to
//! - `tugboat`: connection settings for the external GRC platform
//! - `logging`: default level and output format for the binary
//!
//! Discovery and the permissive/strict asymmetry live in [`discovery`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    load_config, load_config_file, load_config_from, LoadedConfig, DATA_DIR_ENV,
    DEFAULT_CONFIG_FILES,
};
pub use error::{ConfigError, Result};
pub use types::{AuthMode, GrcConfig, LogFormat, LoggingConfig, StorageConfig, TugboatConfig};
