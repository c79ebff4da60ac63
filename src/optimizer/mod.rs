//! # Graph Optimizer
//!
//! Post-layout refinement of a positioned graph, in this order:
//!
//! 1. **Sanitize**: nodes without a finite position and edges with a
//!    missing endpoint or non-finite weight are logged and dropped.
//! 2. **Node weighting**: `weight = degree × type multiplier`.
//! 3. **Spacing**: quadtree-assisted repulsion between nodes closer than
//!    `min_node_distance`, with linearly decaying damping.
//! 4. **Crossing reduction**: greedy endpoint swaps (see
//!    [`reduce_crossings`]). Swaps exchange positions, so the spacing from
//!    step 3 is preserved.
//! 5. **Edge bundling**: parallel edges between the same pair of nodes
//!    share a bundle center at the midpoint of their endpoints.
//! 6. **Edge styling**: `stroke_width = ln(source weight + target weight) ×
//!    edge weight`.
//!
//! A malformed node or edge never aborts the pass; only the build deadline
//! does. Running the optimizer again on its own output leaves positions
//! unchanged once spacing has converged.

mod crossings;
mod spacing;

use std::collections::{BTreeMap, HashMap, HashSet};

pub use crossings::{CrossingStats, count_crossings, reduce_crossings, segments_intersect};
pub use spacing::{SpacingSettings, adjust_spacing};
use tracing::{debug, warn};

use crate::clock::Deadline;
use crate::config::OptimizerConfig;
use crate::error::Result;
use crate::graph::{EdgeBundle, Graph, Position};
use crate::layout::edge_indices;

#[derive(Debug, Clone, Default)]
pub struct GraphOptimizer {
    config: OptimizerConfig,
}

impl GraphOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Refine `graph` in place and record the work done in its metrics
    pub fn optimize(&self, graph: &mut Graph, deadline: &Deadline) -> Result<()> {
        let dropped = sanitize(graph);
        assign_node_weights(graph);

        let mut positions: Vec<Position> = graph.nodes.iter().map(|n| n.position).collect();

        let spacing_iterations = adjust_spacing(
            &mut positions,
            &SpacingSettings {
                min_distance: self.config.min_node_distance,
                max_iterations: self.config.spacing_iterations,
                convergence: self.config.spacing_convergence,
                capacity: self.config.quadtree_capacity,
            },
            deadline,
        )?;

        let crossings = if self.config.reduce_crossings {
            let ranks: Vec<Option<usize>> = graph.nodes.iter().map(|n| n.metadata.rank).collect();
            reduce_crossings(
                &mut positions,
                &ranks,
                &edge_indices(graph),
                self.config.max_crossing_pairs,
                self.config.crossing_rounds,
                deadline,
            )?
        } else {
            CrossingStats::default()
        };

        for (node, position) in graph.nodes.iter_mut().zip(positions) {
            node.position = position;
        }

        if self.config.bundle_edges {
            bundle_edges(graph, self.config.bundle_strength);
        } else {
            for edge in &mut graph.edges {
                edge.metadata.bundle = None;
            }
        }
        style_edges(graph);

        let performance = &mut graph.metadata.performance;
        performance.spacing_iterations = spacing_iterations;
        performance.crossings_detected = crossings.detected;
        performance.crossings_resolved = crossings.resolved;

        debug!(
            graph = %graph.metadata.id,
            dropped,
            spacing_iterations,
            crossings_detected = crossings.detected,
            crossings_resolved = crossings.resolved,
            "graph optimized"
        );

        Ok(())
    }
}

/// Drop malformed nodes and edges; returns how many items were removed
fn sanitize(graph: &mut Graph) -> usize {
    let before = graph.nodes.len() + graph.edges.len();

    graph.nodes.retain(|node| {
        let keep = node.position.is_finite();
        if !keep {
            warn!(node = %node.id, "skipping node with non-finite position");
        }
        keep
    });

    let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    graph.edges.retain(|edge| {
        let keep = ids.contains(edge.source.as_str())
            && ids.contains(edge.target.as_str())
            && edge.weight.is_finite();
        if !keep {
            warn!(edge = %edge.id, "skipping malformed edge");
        }
        keep
    });

    graph.refresh_counts();
    before - (graph.nodes.len() + graph.edges.len())
}

/// `weight = (in + out degree) × type multiplier`
pub fn assign_node_weights(graph: &mut Graph) {
    let mut degree: HashMap<&str, usize> = HashMap::new();
    for edge in &graph.edges {
        *degree.entry(edge.source.as_str()).or_default() += 1;
        *degree.entry(edge.target.as_str()).or_default() += 1;
    }

    let weights: Vec<f64> = graph
        .nodes
        .iter()
        .map(|node| {
            let d = degree.get(node.id.as_str()).copied().unwrap_or(0);
            d as f64 * node.node_type.weight_multiplier()
        })
        .collect();

    for (node, weight) in graph.nodes.iter_mut().zip(weights) {
        node.metadata.weight = weight;
    }
}

/// Attach a shared bundle to every group of parallel edges
pub fn bundle_edges(graph: &mut Graph, strength: f64) {
    let positions: HashMap<&str, Position> = graph
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n.position))
        .collect();

    let mut groups: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
    for (idx, edge) in graph.edges.iter().enumerate() {
        groups
            .entry((edge.source.clone(), edge.target.clone()))
            .or_default()
            .push(idx);
    }

    let mut bundles: Vec<Option<EdgeBundle>> = vec![None; graph.edges.len()];
    for ((source, target), members) in &groups {
        if members.len() < 2 {
            continue;
        }
        let (Some(s), Some(t)) = (positions.get(source.as_str()), positions.get(target.as_str()))
        else {
            continue;
        };

        let bundle = EdgeBundle {
            key: format!("{source}->{target}"),
            center: s.midpoint(t),
            strength,
            size: members.len(),
        };
        for &idx in members {
            bundles[idx] = Some(bundle.clone());
        }
    }

    for (edge, bundle) in graph.edges.iter_mut().zip(bundles) {
        edge.metadata.bundle = bundle;
    }
}

/// Stroke width from endpoint weights, compressed logarithmically
pub fn style_edges(graph: &mut Graph) {
    let weights: HashMap<&str, f64> = graph
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n.metadata.weight))
        .collect();

    let widths: Vec<Option<f64>> = graph
        .edges
        .iter()
        .map(|edge| {
            let combined = weights.get(edge.source.as_str())? + weights.get(edge.target.as_str())?;
            let width = combined.ln() * edge.weight;
            width.is_finite().then_some(width)
        })
        .collect();

    for (edge, width) in graph.edges.iter_mut().zip(widths) {
        match width {
            Some(width) => edge.style.stroke_width = width,
            None => warn!(edge = %edge.id, "keeping default stroke width"),
        }
    }
}
