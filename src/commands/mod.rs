//! Command implementations for the infraviz CLI
//!
//! This module contains the implementations for each CLI command:
//! - render: Build, lay out and optimize one graph from a snapshot
//! - inspect: Detect dependency cycles across a whole snapshot

pub mod inspect;
pub mod render;

use miette::Result;

use crate::cli::Commands;

/// Execute a command based on CLI input
pub fn execute_command(command: Commands) -> Result<()> {
    match &command {
        Commands::Render { .. } => render::execute_render_command(command),
        Commands::Inspect { .. } => inspect::execute_inspect_command(command),
    }
}
