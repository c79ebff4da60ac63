//! Report generation modules for different output formats
//!
//! This module contains report generators for various output formats:
//! - human: Human-readable console output
//! - json: JSON format for programmatic use and viewers
//! - dot: Graphviz with pinned positions, for graphs only

pub mod dot;
pub mod human;
pub mod json;

use crate::error::Result;

/// Common trait for all report generators
///
/// Implemented once per subject: a built [`crate::graph::Graph`] for the
/// render command, a [`crate::detector::DependencyAnalysis`] for inspect.
pub trait ReportGenerator<T: ?Sized> {
    fn generate_report(&self, subject: &T) -> Result<String>;
}

// Re-export for convenience
pub use dot::DotReportGenerator;
pub use human::HumanReportGenerator;
pub use json::JsonReportGenerator;
