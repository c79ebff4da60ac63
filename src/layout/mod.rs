//! # Layout Strategies
//!
//! Every strategy implements [`LayoutStrategy`]: it takes a built graph and
//! writes a finite position into every node, leaving node and edge identity
//! untouched. The strategy is picked from the graph's [`LayoutKind`], which
//! the builder derives from the graph level:
//!
//! - **Hierarchical** (pipelines) and **Ranked** (environments) use
//!   [`RankLayout`]: nodes are assigned to ranks by dependency depth, ordered
//!   within a rank by barycenter sweeps, then spaced by the per-level
//!   separations.
//! - **ForceDirected** (modules) uses [`ForceLayout`], a seeded spring
//!   simulation with repulsion, centering and collision avoidance.
//!
//! [`run_layout`] wraps the strategy with the shared pre- and postconditions:
//! the node ceiling check, finite-position cleanup and optional fit-to-view.

mod force;
mod rank;

pub use force::ForceLayout;
pub use rank::RankLayout;
use tracing::{debug, warn};

use crate::clock::Deadline;
use crate::config::{LayoutConfig, Viewport};
use crate::error::{InfravizError, Result};
use crate::graph::{Graph, LayoutKind, Node, Position};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutStats {
    /// Ordering sweeps or simulation steps actually run
    pub iterations: usize,
}

/// Computes node positions for a graph in place
pub trait LayoutStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn layout(
        &self,
        graph: &mut Graph,
        config: &LayoutConfig,
        deadline: &Deadline,
    ) -> Result<LayoutStats>;
}

pub fn strategy_for(kind: LayoutKind) -> &'static dyn LayoutStrategy {
    match kind {
        LayoutKind::Hierarchical | LayoutKind::Ranked => &RankLayout,
        LayoutKind::ForceDirected => &ForceLayout,
    }
}

/// Lay out `graph` with the strategy and configuration it carries
pub fn run_layout(graph: &mut Graph, deadline: &Deadline) -> Result<LayoutStats> {
    let config = graph.layout_config.clone();
    let strategy = strategy_for(graph.layout);
    layout_with(strategy, graph, &config, deadline)
}

/// Lay out `graph` with an explicit strategy and configuration
pub fn layout_with(
    strategy: &dyn LayoutStrategy,
    graph: &mut Graph,
    config: &LayoutConfig,
    deadline: &Deadline,
) -> Result<LayoutStats> {
    if graph.nodes.len() > config.max_nodes {
        return Err(InfravizError::SizeLimit {
            what: "nodes",
            actual: graph.nodes.len(),
            limit: config.max_nodes,
        });
    }

    let stats = strategy.layout(graph, config, deadline)?;

    for node in &mut graph.nodes {
        if !node.position.is_finite() {
            warn!(node = %node.id, strategy = strategy.name(), "non-finite position reset to origin");
            node.position = Position::default();
        }
    }

    if let Some(viewport) = &config.fit_to_view {
        fit_to_view(graph, viewport);
    }

    debug!(
        strategy = strategy.name(),
        nodes = graph.nodes.len(),
        iterations = stats.iterations,
        "layout complete"
    );

    Ok(stats)
}

/// Scale and translate positions so they fill the viewport minus padding
pub fn fit_to_view(graph: &mut Graph, viewport: &Viewport) {
    if graph.nodes.is_empty() {
        return;
    }

    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for node in &graph.nodes {
        min_x = min_x.min(node.position.x);
        min_y = min_y.min(node.position.y);
        max_x = max_x.max(node.position.x);
        max_y = max_y.max(node.position.y);
    }

    let avail_w = (viewport.width - 2.0 * viewport.padding).max(0.0);
    let avail_h = (viewport.height - 2.0 * viewport.padding).max(0.0);
    let span_w = max_x - min_x;
    let span_h = max_y - min_y;

    let axis_scale = |span: f64, avail: f64| if span > f64::EPSILON { avail / span } else { 1.0 };
    let (mut sx, mut sy) = (axis_scale(span_w, avail_w), axis_scale(span_h, avail_h));
    if viewport.preserve_aspect_ratio {
        let s = match (span_w > f64::EPSILON, span_h > f64::EPSILON) {
            (true, true) => sx.min(sy),
            (true, false) => sx,
            (false, true) => sy,
            (false, false) => 1.0,
        };
        sx = s;
        sy = s;
    }

    let offset_x = viewport.padding + (avail_w - span_w * sx) / 2.0;
    let offset_y = viewport.padding + (avail_h - span_h * sy) / 2.0;

    for node in &mut graph.nodes {
        node.position = Position::new(
            offset_x + (node.position.x - min_x) * sx,
            offset_y + (node.position.y - min_y) * sy,
        );
    }
}

/// Layout bias of a node: heavier types and worse statuses weigh more
pub fn layout_bias(node: &Node) -> f64 {
    node.node_type.weight_multiplier() * node.status.weight_multiplier()
}

/// Edges as node index pairs, without self-loops or dangling endpoints
pub(crate) fn edge_indices(graph: &Graph) -> Vec<(usize, usize)> {
    let index = graph.node_index();
    graph
        .edges
        .iter()
        .filter_map(|edge| {
            let source = *index.get(edge.source.as_str())?;
            let target = *index.get(edge.target.as_str())?;
            (source != target).then_some((source, target))
        })
        .collect()
}
