//! Render command implementation

use miette::{Result, WrapErr};

use crate::cli::Commands;
use crate::common::{ConfigBuilder, FromCommand};
use crate::config::RenderOptions;
use crate::error::InfravizError;

impl FromCommand for RenderOptions {
    fn from_command(command: Commands) -> Result<Self, InfravizError> {
        match command {
            Commands::Render {
                common,
                level,
                id,
                format,
                output,
            } => RenderOptions::builder()
                .with_snapshot(common.snapshot)
                .with_config(common.config)
                .with_level(level.into())
                .with_id(id)
                .with_format(format)
                .with_output(output)
                .build(),
            _ => Err(InfravizError::ConfigurationError {
                message: "Invalid command type for RenderOptions".to_string(),
            }),
        }
    }
}

crate::impl_try_from_command!(RenderOptions);

/// Execute the render command for producing one laid-out graph
pub fn execute_render_command(command: Commands) -> Result<()> {
    let options = RenderOptions::from_command(command)
        .wrap_err("Failed to parse render command configuration")?;

    use crate::executors::CommandExecutor;
    use crate::executors::render::RenderExecutor;
    RenderExecutor::execute(options)
}
