pub mod config;
pub mod error;

pub use config::{AppGroupConfig, Config, ValidationResult, WidgetConfig};
pub use error::{AppError, DatabaseError, RusqliteErrorExt};

use anyhow::Result;

/// Initialize logging for a famcal process. Logs go to stderr.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!("famcal core initialized");
    Ok(())
}
