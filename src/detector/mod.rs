//! # Dependency and Cycle Detection Module
//!
//! Builds an adjacency map over infrastructure entities and finds the
//! dependency cycles in it.
//!
//! ## Algorithm
//!
//! Edges come from two places: each entity's explicit `depends_on` list, and
//! `${...}` interpolations inside its attribute values. An interpolation such
//! as `${aws_instance.web.private_ip}` is resolved by the longest dotted
//! prefix that names an entity (`aws_instance.web`).
//!
//! Cycles are found with a depth-first search per unvisited entity that keeps
//! the current path as a recursion stack. Reaching an entity already on the
//! stack records the stack slice from that entity as a cycle. Cycles are
//! returned, not raised, unless the detector runs in strict mode.
//!
//! References that cross a module (or environment) boundary are counted
//! separately and only followed when the detector allows it.
//!
//! ## Example
//!
//! ```
//! use infraviz::core::{EnvironmentRecord, ModuleRecord};
//! use infraviz::detector::{DependencyDetector, module_entities};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let env = EnvironmentRecord::new("dev", "Dev")
//!     .with_module(ModuleRecord::new("a", "network").depends_on("b"))
//!     .with_module(ModuleRecord::new("b", "database").depends_on("a"));
//!
//! let analysis = DependencyDetector::default().analyze(&module_entities(&env)?)?;
//!
//! assert!(analysis.has_cycles());
//! assert_eq!(analysis.cycle_count(), 1);
//! assert!(!analysis.is_valid());
//! # Ok(())
//! # }
//! ```

mod detector_impl;

pub use detector_impl::*;
