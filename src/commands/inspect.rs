//! Inspect command implementation

use miette::{Result, WrapErr};

use crate::cli::Commands;
use crate::common::{ConfigBuilder, FromCommand};
use crate::config::InspectOptions;
use crate::error::InfravizError;

impl FromCommand for InspectOptions {
    fn from_command(command: Commands) -> Result<Self, InfravizError> {
        match command {
            Commands::Inspect {
                common,
                format,
                strict,
                allow_cross_boundary,
                error_on_cycles,
            } => InspectOptions::builder()
                .with_snapshot(common.snapshot)
                .with_config(common.config)
                .with_format(format)
                .with_strict(strict)
                .with_allow_cross_boundary(allow_cross_boundary)
                .with_error_on_cycles(error_on_cycles)
                .build(),
            _ => Err(InfravizError::ConfigurationError {
                message: "Invalid command type for InspectOptions".to_string(),
            }),
        }
    }
}

crate::impl_try_from_command!(InspectOptions);

/// Execute the inspect command for detecting dependency cycles
pub fn execute_inspect_command(command: Commands) -> Result<()> {
    let options = InspectOptions::from_command(command)
        .wrap_err("Failed to parse inspect command configuration")?;

    use crate::executors::CommandExecutor;
    use crate::executors::inspect::InspectExecutor;
    InspectExecutor::execute(options)
}
