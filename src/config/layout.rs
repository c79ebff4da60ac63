//! Layout configuration carried by every graph

use serde::{Deserialize, Serialize};

use crate::constants::layout as defaults;
use crate::constants::limits;
use crate::graph::GraphLevel;

/// Main axis along which ranks advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    TopBottom,
    LeftRight,
}

/// Target area positions are scaled into when fitting to view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
    pub preserve_aspect_ratio: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            padding: 40.0,
            preserve_aspect_ratio: true,
        }
    }
}

/// Tuning for the force-directed simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceSettings {
    pub max_iterations: usize,
    pub repulsion: f64,
    /// Pairs further apart than this do not repel
    pub max_distance: f64,
    pub spring_length: f64,
    pub spring_strength: f64,
    pub centering: f64,
    pub min_separation: f64,
    /// Stop once the summed movement of one iteration drops below this
    pub epsilon: f64,
    pub seed: u64,
    /// Iterations between deadline checks
    pub batch_size: usize,
    /// Yield the thread between batches
    pub cooperative: bool,
}

impl Default for ForceSettings {
    fn default() -> Self {
        Self {
            max_iterations: defaults::FORCE_MAX_ITERATIONS,
            repulsion: defaults::FORCE_REPULSION,
            max_distance: defaults::FORCE_MAX_DISTANCE,
            spring_length: defaults::FORCE_SPRING_LENGTH,
            spring_strength: defaults::FORCE_SPRING_STRENGTH,
            centering: defaults::FORCE_CENTERING,
            min_separation: defaults::FORCE_MIN_SEPARATION,
            epsilon: defaults::FORCE_EPSILON,
            seed: defaults::FORCE_SEED,
            batch_size: defaults::FORCE_BATCH_SIZE,
            cooperative: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub direction: Direction,
    pub node_separation: f64,
    pub rank_separation: f64,
    pub ordering_sweeps: usize,
    /// Node ceiling checked before any layout runs
    pub max_nodes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit_to_view: Option<Viewport>,
    pub force: ForceSettings,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: Direction::TopBottom,
            node_separation: defaults::ENVIRONMENT_NODE_SEPARATION,
            rank_separation: defaults::ENVIRONMENT_RANK_SEPARATION,
            ordering_sweeps: defaults::ORDERING_SWEEPS,
            max_nodes: limits::MAX_NODES,
            fit_to_view: None,
            force: ForceSettings::default(),
        }
    }
}

impl LayoutConfig {
    /// Per-view tuning: pipelines read left to right with wide stage gaps
    pub fn for_level(level: GraphLevel) -> Self {
        match level {
            GraphLevel::Pipeline => Self {
                direction: Direction::LeftRight,
                node_separation: defaults::PIPELINE_NODE_SEPARATION,
                rank_separation: defaults::PIPELINE_RANK_SEPARATION,
                ..Self::default()
            },
            GraphLevel::Environment => Self::default(),
            GraphLevel::Module => Self {
                node_separation: defaults::FORCE_MIN_SEPARATION,
                ..Self::default()
            },
        }
    }

    pub fn with_fit_to_view(mut self, viewport: Viewport) -> Self {
        self.fit_to_view = Some(viewport);
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }
}
