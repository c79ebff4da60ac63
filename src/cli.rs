use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::common::CommonArgs;
use crate::graph::GraphLevel;

#[derive(Parser)]
#[command(
    name = "infraviz",
    about = "Lay out infrastructure-as-code dependency graphs",
    long_about = "infraviz turns environment, module and resource records into positioned \
                  node-edge diagrams. It detects dependency cycles, lays graphs out with a \
                  rank-based or force-directed strategy, and reduces edge crossings and \
                  overlaps before emitting render-ready output.",
    version
)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build, lay out and optimize a single graph
    ///
    /// Pipeline graphs show every environment in order, environment graphs
    /// show the modules of one environment, and module graphs show the
    /// resources of one module.
    #[command(
        long_about = "Build one graph from a snapshot file. The level selects what becomes a \
                      node: environments (pipeline), modules (environment) or resources \
                      (module). Environment and module levels need --id to pick the entity. \
                      The graph is laid out with the strategy for its level, optimized, and \
                      written as JSON, Graphviz DOT or a human summary."
    )]
    Render {
        #[command(flatten)]
        common: CommonArgs,

        /// Which level of the infrastructure to draw
        #[arg(short, long, value_enum, env = "INFRAVIZ_LEVEL")]
        level: LevelArg,

        /// Environment id (environment level) or module id (module level)
        #[arg(long, value_name = "ID", env = "INFRAVIZ_ID")]
        id: Option<String>,

        /// Output format
        #[arg(
            short,
            long,
            value_enum,
            default_value = crate::constants::output::DEFAULT_FORMAT,
            env = "INFRAVIZ_FORMAT"
        )]
        format: RenderFormat,

        /// Output file (stdout if not specified)
        #[arg(short, long, env = "INFRAVIZ_OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Detect dependency cycles across a whole snapshot
    ///
    /// Checks the modules of every environment and the resources of every
    /// module, including references made through `${...}` interpolation.
    #[command(
        long_about = "Run dependency analysis over every environment's modules and every \
                      module's resources. Explicit dependency lists and interpolated references \
                      are both followed. References that cross a module boundary are rejected \
                      unless --allow-cross-boundary is given."
    )]
    Inspect {
        #[command(flatten)]
        common: CommonArgs,

        /// Output format
        #[arg(
            short,
            long,
            value_enum,
            default_value = crate::constants::output::DEFAULT_INSPECT_FORMAT,
            env = "INFRAVIZ_FORMAT"
        )]
        format: InspectFormat,

        /// Fail on the first cycle instead of reporting all of them
        #[arg(long, env = "INFRAVIZ_STRICT")]
        strict: bool,

        /// Accept references across module boundaries
        #[arg(long, env = "INFRAVIZ_ALLOW_CROSS_BOUNDARY")]
        allow_cross_boundary: bool,

        /// Exit with error code if cycles are found
        #[arg(long, env = "INFRAVIZ_ERROR_ON_CYCLES")]
        error_on_cycles: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, clap::ValueEnum)]
pub enum LevelArg {
    Pipeline,
    Environment,
    Module,
}

impl From<LevelArg> for GraphLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Pipeline => GraphLevel::Pipeline,
            LevelArg::Environment => GraphLevel::Environment,
            LevelArg::Module => GraphLevel::Module,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, clap::ValueEnum)]
pub enum RenderFormat {
    Json,
    Dot,
    Human,
}

#[derive(Clone, Copy, Debug, PartialEq, clap::ValueEnum)]
pub enum InspectFormat {
    Human,
    Json,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_render() {
        let cli = Cli::parse_from([
            "infraviz",
            "render",
            "snapshot.json",
            "--level",
            "environment",
            "--id",
            "dev",
            "--format",
            "dot",
        ]);

        match cli.command {
            Commands::Render {
                common,
                level,
                id,
                format,
                output,
            } => {
                assert_eq!(common.snapshot, PathBuf::from("snapshot.json"));
                assert_eq!(level, LevelArg::Environment);
                assert_eq!(id.as_deref(), Some("dev"));
                assert_eq!(format, RenderFormat::Dot);
                assert!(output.is_none());
            }
            _ => panic!("Expected Render command"),
        }
    }

    #[test]
    fn test_parse_inspect_flags() {
        let cli = Cli::parse_from(["infraviz", "-v", "inspect", "snapshot.json", "--strict"]);

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Inspect {
                strict,
                allow_cross_boundary,
                format,
                ..
            } => {
                assert!(strict);
                assert!(!allow_cross_boundary);
                assert_eq!(format, InspectFormat::Human);
            }
            _ => panic!("Expected Inspect command"),
        }
    }
}
