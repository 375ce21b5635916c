//! Logging setup.
//!
//! All diagnostics go to stderr; stdout carries only the envelope.

use color_eyre::eyre::{eyre, Result};
use grc_config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Filter precedence: `RUST_LOG`, then `-v` (`debug`, `-vv` for `trace`),
/// then `logging.level` from config. An unparsable level falls back to `warn`.
pub fn init(config: &LoggingConfig, verbose: u8) -> Result<()> {
    let (filter, rejected_level) = build_filter(config, verbose, std::env::var("RUST_LOG").ok());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.map_err(|err| eyre!("failed to initialize logging: {}", err))?;

    if let Some(level) = rejected_level {
        tracing::warn!(level = %level, "invalid logging.level, using warn");
    }
    Ok(())
}

/// Returns the filter and, if the configured level was unusable, that level.
fn build_filter(config: &LoggingConfig, verbose: u8, rust_log: Option<String>) -> (EnvFilter, Option<String>) {
    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        if let Ok(filter) = EnvFilter::try_new(&directives) {
            return (filter, None);
        }
    }
    match verbose {
        0 => {}
        1 => return (EnvFilter::new("debug"), None),
        _ => return (EnvFilter::new("trace"), None),
    }
    match EnvFilter::try_new(&config.level) {
        Ok(filter) => (filter, None),
        Err(_) => (EnvFilter::new("warn"), Some(config.level.clone())),
    }
}
