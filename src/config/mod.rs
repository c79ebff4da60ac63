//! # Configuration Module
//!
//! Engine tunables and the option structs behind each CLI command.
//!
//! - **EngineConfig**: limits, cache lifetimes, validation policy, optimizer
//!   settings and per-level layouts, loadable from TOML
//! - **LayoutConfig**: the settings a layout strategy runs with; a copy is
//!   stored on every graph
//! - **RenderOptions** / **InspectOptions**: command configurations built
//!   with the `impl_builder!` pattern
//!
//! ## Example
//!
//! ```
//! use infraviz::config::{EngineConfig, LayoutConfig, Viewport};
//! use infraviz::graph::GraphLevel;
//!
//! let config = EngineConfig::from_toml_str("inline", "[limits]\nmax_nodes = 200").unwrap();
//! assert_eq!(config.layout_for(GraphLevel::Module).max_nodes, 200);
//!
//! let fitted = LayoutConfig::for_level(GraphLevel::Pipeline).with_fit_to_view(Viewport::default());
//! assert!(fitted.fit_to_view.is_some());
//! ```

pub mod engine;
pub mod inspect;
pub mod layout;
pub mod render;

pub use engine::{
    CacheConfig, EngineConfig, LayoutSection, LimitsConfig, OptimizerConfig, ValidationConfig,
};
pub use inspect::InspectOptions;
pub use layout::{Direction, ForceSettings, LayoutConfig, Viewport};
pub use render::RenderOptions;
