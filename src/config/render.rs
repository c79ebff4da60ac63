//! Render command configuration

use std::path::PathBuf;

use crate::cli::RenderFormat;
use crate::graph::GraphLevel;
use crate::impl_builder;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub snapshot: PathBuf,
    pub config: Option<PathBuf>,
    pub level: GraphLevel,
    pub id: Option<String>,
    pub format: RenderFormat,
    pub output: Option<PathBuf>,
}

impl RenderOptions {
    pub fn builder() -> RenderOptionsBuilder {
        RenderOptionsBuilder::new()
    }
}

impl_builder! {
    RenderOptionsBuilder => RenderOptions {
        snapshot: PathBuf => with_snapshot,
        config: Option<PathBuf> => with_config,
        level: GraphLevel => with_level,
        id: Option<String> => with_id,
        format: RenderFormat => with_format,
        output: Option<PathBuf> => with_output,
    }
}
