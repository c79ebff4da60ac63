//! # Infraviz - Layout Engine for Infrastructure Dependency Diagrams
//!
//! Infraviz turns infrastructure-as-code records (environments, modules,
//! resources) into positioned node-edge graphs ready for a diagram viewer.
//! It detects dependency cycles, including references hidden in `${...}`
//! interpolations, lays graphs out with a strategy picked by level, and
//! reduces edge crossings and node overlaps before handing the graph on.
//!
//! ## Main Components
//!
//! - **Detector**: Builds adjacency maps from explicit and interpolated
//!   references and finds cycles
//! - **Graph**: The node-edge model and the builder for each level
//! - **Layout**: Rank-based (pipeline, environment) and force-directed
//!   (module) strategies
//! - **Optimizer**: Node weighting, spacing, crossing reduction, bundling
//! - **Engine**: Runs every stage under one deadline, with a TTL cache and
//!   optional update broadcast
//! - **Reports**: JSON, Graphviz DOT and human-readable output
//!
//! ## Usage
//!
//! ### Building an Environment Graph
//!
//! ```
//! use std::sync::Arc;
//!
//! use infraviz::clock::SystemClock;
//! use infraviz::config::EngineConfig;
//! use infraviz::core::{EnvironmentRecord, ModuleRecord};
//! use infraviz::engine::GraphEngine;
//! use infraviz::graph::ValidationStatus;
//! use infraviz::reports::{DotReportGenerator, ReportGenerator};
//!
//! # fn main() -> miette::Result<()> {
//! let engine = GraphEngine::new(EngineConfig::default(), Arc::new(SystemClock))?;
//!
//! let env = EnvironmentRecord::new("dev", "Dev")
//!     .with_module(ModuleRecord::new("app", "app").depends_on("db"))
//!     .with_module(ModuleRecord::new("db", "database"));
//!
//! let graph = engine.build_environment_graph(&env)?;
//! assert_eq!(graph.metadata.node_count, 2);
//! assert_eq!(graph.metadata.status, ValidationStatus::Valid);
//!
//! // Graphviz output keeps the engine's positions
//! let dot = DotReportGenerator::default().generate_report(graph.as_ref())?;
//! assert!(dot.contains("pos="));
//! # Ok(())
//! # }
//! ```
//!
//! ### Subscribing to Updates
//!
//! ```
//! use std::sync::Arc;
//!
//! use infraviz::broadcast::{BroadcastHub, GraphUpdate};
//! use infraviz::clock::SystemClock;
//! use infraviz::config::EngineConfig;
//! use infraviz::core::EnvironmentRecord;
//! use infraviz::engine::GraphEngine;
//!
//! # fn main() -> miette::Result<()> {
//! let hub = Arc::new(BroadcastHub::default());
//! let mut updates = hub.subscribe();
//!
//! let engine =
//!     GraphEngine::new(EngineConfig::default(), Arc::new(SystemClock))?.with_publisher(hub);
//!
//! let environments = [EnvironmentRecord::new("dev", "Dev")];
//! engine.build_pipeline_graph("release", "Release", &environments)?;
//!
//! match updates.try_recv() {
//!     Ok(GraphUpdate::Built(graph)) => assert_eq!(graph.metadata.id, "release"),
//!     other => panic!("expected a built graph, got {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

// Private modules
mod constants;
mod logging;
mod utils;

// Public modules
pub mod broadcast;
pub mod cache;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod common;
pub mod config;
pub mod core;
pub mod detector;
pub mod engine;
pub mod error;
pub mod executors;
pub mod graph;
pub mod layout;
pub mod optimizer;
pub mod reports;
pub mod spatial;

// Main entry point for the library
pub fn run() -> miette::Result<()> {
    use clap::Parser;

    use crate::cli::Cli;
    use crate::commands::execute_command;

    let cli = Cli::parse();
    logging::init(cli.verbose);

    execute_command(cli.command)
}
