//! Logging setup
//!
//! Library code only emits `tracing` events. Binaries and test harnesses
//! that want to see them install a subscriber once with [`init_logging`].

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Build the event filter: `RUST_LOG` when set, else the configured level
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            Error::Configuration(format!("invalid log level '{}': {}", config.level, e))
        }),
    }
}

/// Install a global fmt subscriber
///
/// # Errors
///
/// `Error::Configuration` for an unparseable level, or when a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| Error::Configuration(format!("failed to install subscriber: {}", e)))
}
