//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file '{path}' not found")]
    NotFound {
        /// Requested path.
        path: String,
    },

    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        /// File that failed to read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse YAML.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        /// File that failed to parse.
        path: String,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },

    /// A field holds a value that parses but is not usable.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Dotted field path, e.g. `storage.data_dir`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}
