//! Default tunables for the engine
//!
//! Every value here can be overridden through the TOML engine configuration;
//! these are the values used when a section or key is absent.

use std::time::Duration;

/// Hard limits enforced before layout
pub mod limits {
    use super::*;

    pub const MAX_NODES: usize = 1000;
    pub const MAX_EDGES: usize = 5000;
    pub const BUILD_TIMEOUT: Duration = Duration::from_millis(5000);
}

/// Cache lifetimes
pub mod cache {
    use super::*;

    /// Fully built and optimized graphs
    pub const GRAPH_TTL: Duration = Duration::from_secs(60 * 60);
    /// Raw builder output, before layout
    pub const BUILDER_TTL: Duration = Duration::from_secs(30 * 60);
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
}

/// Node sizing and per-type weighting
pub mod nodes {
    pub const DEFAULT_WIDTH: f64 = 160.0;
    pub const DEFAULT_HEIGHT: f64 = 48.0;

    pub const MODULE_WEIGHT_MULTIPLIER: f64 = 1.5;
    pub const RESOURCE_WEIGHT_MULTIPLIER: f64 = 1.2;
    pub const DEFAULT_WEIGHT_MULTIPLIER: f64 = 1.0;

    pub const ERROR_STATUS_MULTIPLIER: f64 = 1.5;
    pub const WARNING_STATUS_MULTIPLIER: f64 = 1.2;
}

/// Edge weights assigned by the builder
pub mod edges {
    pub const DEPENDENCY_WEIGHT: f64 = 1.0;
    pub const FLOW_WEIGHT: f64 = 1.0;
    pub const MODULE_LINK_WEIGHT: f64 = 0.8;
    pub const REFERENCE_WEIGHT: f64 = 0.5;
}

/// Layout defaults
pub mod layout {
    pub const PIPELINE_NODE_SEPARATION: f64 = 80.0;
    /// Pipeline stages get a wider gap than module ranks
    pub const PIPELINE_RANK_SEPARATION: f64 = 220.0;
    pub const ENVIRONMENT_NODE_SEPARATION: f64 = 60.0;
    pub const ENVIRONMENT_RANK_SEPARATION: f64 = 120.0;
    pub const ORDERING_SWEEPS: usize = 4;

    pub const FORCE_MAX_ITERATIONS: usize = 300;
    pub const FORCE_REPULSION: f64 = 12_000.0;
    pub const FORCE_MAX_DISTANCE: f64 = 600.0;
    pub const FORCE_SPRING_LENGTH: f64 = 180.0;
    pub const FORCE_SPRING_STRENGTH: f64 = 0.05;
    pub const FORCE_CENTERING: f64 = 0.01;
    pub const FORCE_MIN_SEPARATION: f64 = 90.0;
    pub const FORCE_EPSILON: f64 = 0.5;
    pub const FORCE_BATCH_SIZE: usize = 25;
    pub const FORCE_SEED: u64 = 0x1f2e_3d4c;
    /// Below this node count forces are computed serially
    pub const PARALLEL_THRESHOLD: usize = 64;
}

/// Optimizer defaults
pub mod optimizer {
    pub const MIN_NODE_DISTANCE: f64 = 50.0;
    pub const SPACING_ITERATIONS: usize = 50;
    pub const SPACING_CONVERGENCE: f64 = 0.1;
    pub const MAX_CROSSING_PAIRS: usize = 250_000;
    pub const CROSSING_ROUNDS: usize = 16;
    pub const BUNDLE_STRENGTH: f64 = 0.85;
    pub const QUADTREE_CAPACITY: usize = 4;
}

/// Output formatting configuration
pub mod output {
    pub const DEFAULT_FORMAT: &str = "json";
    pub const DEFAULT_INSPECT_FORMAT: &str = "human";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_ttls() {
        assert_eq!(cache::GRAPH_TTL, Duration::from_secs(3600));
        assert_eq!(cache::BUILDER_TTL, Duration::from_secs(1800));
    }

    #[test]
    fn test_pipeline_stages_are_wider_than_ranks() {
        assert!(layout::PIPELINE_RANK_SEPARATION > layout::ENVIRONMENT_RANK_SEPARATION);
    }

    #[test]
    fn test_force_separation_clears_optimizer_threshold() {
        assert!(layout::FORCE_MIN_SEPARATION > optimizer::MIN_NODE_DISTANCE);
    }
}
