//! Tracing initialisation

use tracing_subscriber::EnvFilter;

use enl_core::{EnlError, EnlResult};

use crate::LogFormat;

/// Install the global subscriber
///
/// The filter comes from `RUST_LOG`, falling back to `info`. Fails if a
/// global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> EnlResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .flatten_event(true)
            .try_init(),
    };

    result.map_err(|e| EnlError::InvalidConfig(format!("tracing: {}", e)))
}
