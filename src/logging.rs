use tracing_subscriber::{EnvFilter, fmt};
use crate::core::{Result, TutorError};

/// Install the global subscriber. `RUST_LOG` controls the level, `info` by default.
pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|err| TutorError::internal_error(format!("Failed to initialize logging: {}", err)))?;

    tracing::debug!("logging initialized");
    Ok(())
}
