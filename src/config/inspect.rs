//! Inspect command configuration

use std::path::PathBuf;

use crate::cli::InspectFormat;
use crate::impl_builder;

#[derive(Debug, Clone)]
pub struct InspectOptions {
    pub snapshot: PathBuf,
    pub config: Option<PathBuf>,
    pub format: InspectFormat,
    pub strict: bool,
    pub allow_cross_boundary: bool,
    pub error_on_cycles: bool,
}

impl InspectOptions {
    pub fn builder() -> InspectOptionsBuilder {
        InspectOptionsBuilder::new()
    }
}

impl_builder! {
    InspectOptionsBuilder => InspectOptions {
        snapshot: PathBuf => with_snapshot,
        config: Option<PathBuf> => with_config,
        format: InspectFormat => with_format,
        strict: bool => with_strict,
        allow_cross_boundary: bool => with_allow_cross_boundary,
        error_on_cycles: bool => with_error_on_cycles,
    }
}
