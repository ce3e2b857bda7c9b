//! Tracing subscriber setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::service::config::{LogConfig, LogFormat};

/// Builds the filter: `RUST_LOG` when set, otherwise the configured level.
/// Invalid directives are dropped rather than rejected.
#[must_use]
pub fn env_filter(config: &LogConfig) -> EnvFilter {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| config.level.clone());
    EnvFilter::builder().parse_lossy(directives)
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> Result<(), TryInitError> {
    let layer = match config.format {
        LogFormat::Pretty => fmt::layer().with_target(true).pretty().boxed(),
        LogFormat::Compact => fmt::layer().with_target(true).compact().boxed(),
        LogFormat::Json => fmt::layer().with_target(true).json().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(layer)
        .try_init()
}
