//! Command executors that handle the actual logic for each command

pub mod inspect;
pub mod render;

use std::path::Path;

use miette::{Result, WrapErr};
use tracing::debug;

use crate::config::EngineConfig;
use crate::core::InfrastructureSnapshot;

/// Trait for command executors
pub trait CommandExecutor {
    type Config;

    /// Execute the command with the given configuration
    fn execute(config: Self::Config) -> Result<()>;
}

/// Engine configuration from `--config`, or the built-in defaults
pub(crate) fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading engine configuration");
            Ok(EngineConfig::load(path)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

pub(crate) fn load_snapshot(path: &Path) -> Result<InfrastructureSnapshot> {
    InfrastructureSnapshot::load(path)
        .wrap_err_with(|| format!("Failed to load snapshot '{}'", path.display()))
}
