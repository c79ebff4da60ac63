//! # Graph Model and Construction Module
//!
//! The node-edge graph every other stage works on, and the builder that
//! produces it from domain records.
//!
//! ## Components
//!
//! ### Graph Model
//! - **Graph**: nodes, edges, the layout kind and configuration used, and
//!   metadata (counts, rolled-up status, timings, cycles, diagnostics)
//! - **Node** / **Edge**: typed elements with style and metadata; node ids
//!   are `{type}:{domain id}`, edge ids `{source}->{target}`
//!
//! ### Graph Building
//! - **GraphBuilder**: one method per level (pipeline, environment, module),
//!   plus [`GraphBuilder::apply_analysis`] to fold detected implicit
//!   references and cycles into a built graph
//! - **style**: colours and shapes by node type, edge type and status
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use infraviz::clock::SystemClock;
//! use infraviz::core::{EnvironmentRecord, ModuleRecord};
//! use infraviz::graph::{GraphBuilder, LayoutKind};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let env = EnvironmentRecord::new("dev", "Dev")
//!     .with_module(ModuleRecord::new("app", "app").depends_on("net"))
//!     .with_module(ModuleRecord::new("net", "network"));
//!
//! let graph = GraphBuilder::new(Arc::new(SystemClock)).build_environment(&env)?;
//!
//! assert_eq!(graph.metadata.node_count, 2);
//! assert_eq!(graph.edges[0].id, "module:app->module:net");
//! assert_eq!(graph.layout, LayoutKind::Ranked);
//! # Ok(())
//! # }
//! ```

mod builder;
pub mod style;
mod types;

// Re-export main types and builders
pub use builder::GraphBuilder;
pub use types::{
    Edge, EdgeBundle, EdgeMetadata, EdgeStyle, EdgeType, Graph, GraphLevel, GraphMetadata,
    LayoutKind, Node, NodeMetadata, NodeStyle, NodeType, PerformanceMetrics, Position,
    ValidationStatus,
};
