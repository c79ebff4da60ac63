//! Engine configuration
//!
//! Loaded from TOML; every section and key is optional.
//!
//! ```toml
//! [limits]
//! max_nodes = 500
//! build_timeout_ms = 3000
//!
//! [validation]
//! strict = true
//!
//! [layout.module.force]
//! max_iterations = 150
//! ```

use std::path::Path;
use std::time::Duration;

use miette::{NamedSource, SourceSpan};
use serde::{Deserialize, Serialize};

use super::layout::LayoutConfig;
use crate::constants;
use crate::error::{InfravizError, Result};
use crate::graph::GraphLevel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_nodes: usize,
    pub max_edges: usize,
    pub build_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_nodes: constants::limits::MAX_NODES,
            max_edges: constants::limits::MAX_EDGES,
            build_timeout_ms: constants::limits::BUILD_TIMEOUT.as_millis() as u64,
        }
    }
}

impl LimitsConfig {
    pub fn build_timeout(&self) -> Duration {
        Duration::from_millis(self.build_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub graph_ttl_secs: u64,
    pub builder_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            graph_ttl_secs: constants::cache::GRAPH_TTL.as_secs(),
            builder_ttl_secs: constants::cache::BUILDER_TTL.as_secs(),
            sweep_interval_secs: constants::cache::SWEEP_INTERVAL.as_secs(),
        }
    }
}

impl CacheConfig {
    pub fn graph_ttl(&self) -> Duration {
        Duration::from_secs(self.graph_ttl_secs)
    }

    pub fn builder_ttl(&self) -> Duration {
        Duration::from_secs(self.builder_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Raise a hard error on dependency cycles instead of marking the graph
    pub strict: bool,
    /// Accept references that cross a module (or environment) boundary
    pub allow_cross_boundary: bool,
    /// Record dependencies on absent entities as diagnostics
    pub surface_dangling: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            strict: false,
            allow_cross_boundary: false,
            surface_dangling: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub reduce_crossings: bool,
    pub max_crossing_pairs: usize,
    pub crossing_rounds: usize,
    pub min_node_distance: f64,
    pub spacing_iterations: usize,
    pub spacing_convergence: f64,
    pub quadtree_capacity: usize,
    pub bundle_edges: bool,
    pub bundle_strength: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        use constants::optimizer::*;

        Self {
            reduce_crossings: true,
            max_crossing_pairs: MAX_CROSSING_PAIRS,
            crossing_rounds: CROSSING_ROUNDS,
            min_node_distance: MIN_NODE_DISTANCE,
            spacing_iterations: SPACING_ITERATIONS,
            spacing_convergence: SPACING_CONVERGENCE,
            quadtree_capacity: QUADTREE_CAPACITY,
            bundle_edges: true,
            bundle_strength: BUNDLE_STRENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSection {
    pub pipeline: LayoutConfig,
    pub environment: LayoutConfig,
    pub module: LayoutConfig,
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self {
            pipeline: LayoutConfig::for_level(GraphLevel::Pipeline),
            environment: LayoutConfig::for_level(GraphLevel::Environment),
            module: LayoutConfig::for_level(GraphLevel::Module),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub limits: LimitsConfig,
    pub cache: CacheConfig,
    pub validation: ValidationConfig,
    pub optimizer: OptimizerConfig,
    pub layout: LayoutSection,
}

impl EngineConfig {
    /// Parse a TOML document; `name` labels diagnostics
    pub fn from_toml_str(name: &str, content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content).map_err(|e| {
            let span = e
                .span()
                .map(|span| SourceSpan::new(span.start.into(), span.end - span.start));

            InfravizError::TomlParseError(Box::new(crate::error::TomlParseError {
                file: name.to_string(),
                source_code: NamedSource::new(name, content.to_string()),
                span,
                source: e,
            }))
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| InfravizError::FileReadError {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_toml_str(&path.display().to_string(), &content)
    }

    /// Layout settings for a level with the global node ceiling applied
    pub fn layout_for(&self, level: GraphLevel) -> LayoutConfig {
        let config = match level {
            GraphLevel::Pipeline => &self.layout.pipeline,
            GraphLevel::Environment => &self.layout.environment,
            GraphLevel::Module => &self.layout.module,
        };

        let ceiling = config.max_nodes.min(self.limits.max_nodes);
        config.clone().with_max_nodes(ceiling)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| Err(InfravizError::ConfigurationError { message });

        if self.limits.max_nodes == 0 || self.limits.max_edges == 0 {
            return fail("limits.max_nodes and limits.max_edges must be positive".to_string());
        }
        if self.limits.build_timeout_ms == 0 {
            return fail("limits.build_timeout_ms must be positive".to_string());
        }

        for (name, layout) in [
            ("pipeline", &self.layout.pipeline),
            ("environment", &self.layout.environment),
            ("module", &self.layout.module),
        ] {
            if layout.node_separation <= 0.0 || layout.rank_separation <= 0.0 {
                return fail(format!("layout.{name}: separations must be positive"));
            }
            if layout.force.max_iterations == 0 || layout.force.batch_size == 0 {
                return fail(format!(
                    "layout.{name}.force: max_iterations and batch_size must be positive"
                ));
            }
            if let Some(viewport) = &layout.fit_to_view
                && (viewport.width <= 2.0 * viewport.padding
                    || viewport.height <= 2.0 * viewport.padding)
            {
                return fail(format!(
                    "layout.{name}.fit_to_view: viewport must be larger than its padding"
                ));
            }
        }

        if self.optimizer.min_node_distance <= 0.0 || self.optimizer.quadtree_capacity == 0 {
            return fail(
                "optimizer.min_node_distance and optimizer.quadtree_capacity must be positive"
                    .to_string(),
            );
        }

        Ok(())
    }
}
