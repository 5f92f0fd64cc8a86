use crate::config::LogLevel;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError};

/// Installs the global JSON subscriber; `RUST_LOG` takes precedence over
/// the configured level.
pub fn init_subscriber(log_level: LogLevel) -> Result<(), TryInitError> {
    let default_filter = format!("{},image=warn", log_level.as_str());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_level(true))
        .try_init()
}
