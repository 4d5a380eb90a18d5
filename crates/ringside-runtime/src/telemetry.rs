//! Structured logging setup

use ringside_core::{RingsideError, RingsideResult};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured filter. Calling this
/// again after a subscriber is installed returns an error instead of
/// replacing it.
pub fn init_logging(config: &LoggingConfig) -> RingsideResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| RingsideError::InvalidConfig(format!("log filter: {}", e)))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };

    result.map_err(|e| RingsideError::InvalidConfig(format!("logging already initialized: {}", e)))
}
