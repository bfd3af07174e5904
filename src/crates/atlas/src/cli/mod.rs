//! Command handlers for the `atlas` binary.

pub mod inspect;
pub mod run;

pub use inspect::{handle_routes, handle_tools};
pub use run::{handle_run, RunArgs};

use crate::config::{AtlasConfig, ConfigLoader, LoggingConfig};
use crate::error::Result;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Logs go to stderr; `RUST_LOG` wins over
/// the configured level.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = match (config.format.as_str(), config.timestamps) {
        ("pretty", true) => builder.pretty().try_init(),
        ("pretty", false) => builder.pretty().without_time().try_init(),
        (_, true) => builder.compact().try_init(),
        (_, false) => builder.compact().without_time().try_init(),
    };
}

/// Explicit file if given, else the layered user and project files.
pub async fn load_config(path: Option<&Path>) -> Result<AtlasConfig> {
    match path {
        Some(path) => {
            let mut config = ConfigLoader::load_file(path).await?;
            config.apply_env_overrides()?;
            Ok(config)
        }
        None => ConfigLoader::new().load().await,
    }
}
