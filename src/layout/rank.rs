use std::collections::VecDeque;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::trace;

use super::{LayoutStats, LayoutStrategy, edge_indices, layout_bias};
use crate::clock::Deadline;
use crate::config::{Direction, LayoutConfig};
use crate::error::Result;
use crate::graph::{Graph, Position};

/// Rank-based layout for pipelines and environments
///
/// Nodes are placed on discrete ranks by their depth along edge direction.
/// Members of a dependency cycle are collapsed first so they share a rank.
/// Within a rank, heavier nodes start in the middle and barycenter sweeps
/// then reorder each rank against its neighbours, keeping a sweep only if it
/// lowers the number of crossings between adjacent ranks.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankLayout;

impl LayoutStrategy for RankLayout {
    fn name(&self) -> &'static str {
        "rank"
    }

    fn layout(
        &self,
        graph: &mut Graph,
        config: &LayoutConfig,
        deadline: &Deadline,
    ) -> Result<LayoutStats> {
        let count = graph.nodes.len();
        if count == 0 {
            return Ok(LayoutStats::default());
        }

        let links = edge_indices(graph);
        let ranks = assign_ranks(count, &links);
        let weights: Vec<f64> = graph.nodes.iter().map(layout_bias).collect();

        let mut layers = initial_layers(&ranks, &weights);
        let sweeps = order_layers(&mut layers, &ranks, &links, config.ordering_sweeps, deadline)?;

        assign_coordinates(graph, &layers, config);
        for (node, rank) in graph.nodes.iter_mut().zip(&ranks) {
            node.metadata.rank = Some(*rank);
        }

        trace!(ranks = layers.len(), sweeps, "ranked layout assigned");

        Ok(LayoutStats { iterations: sweeps })
    }
}

/// Longest-path rank per node over the condensation of the graph
fn assign_ranks(count: usize, links: &[(usize, usize)]) -> Vec<usize> {
    let mut dag = DiGraph::<(), ()>::with_capacity(count, links.len());
    let indices: Vec<NodeIndex> = (0..count).map(|_| dag.add_node(())).collect();
    for &(source, target) in links {
        dag.add_edge(indices[source], indices[target], ());
    }

    let components = tarjan_scc(&dag);
    let mut component_of = vec![0usize; count];
    for (component, members) in components.iter().enumerate() {
        for member in members {
            component_of[member.index()] = component;
        }
    }

    // Components come back in reverse topological order
    let mut component_rank = vec![0usize; components.len()];
    for component in (0..components.len()).rev() {
        for member in &components[component] {
            for next in dag.neighbors(*member) {
                let next_component = component_of[next.index()];
                if next_component != component {
                    component_rank[next_component] =
                        component_rank[next_component].max(component_rank[component] + 1);
                }
            }
        }
    }

    component_of
        .into_iter()
        .map(|component| component_rank[component])
        .collect()
}

fn initial_layers(ranks: &[usize], weights: &[f64]) -> Vec<Vec<usize>> {
    let depth = ranks.iter().max().map_or(0, |rank| rank + 1);
    let mut layers = vec![Vec::new(); depth];
    for (idx, &rank) in ranks.iter().enumerate() {
        layers[rank].push(idx);
    }

    layers
        .iter()
        .map(|layer| center_heavy(layer, weights))
        .collect()
}

/// Heaviest node in the middle, lighter ones alternating outward
fn center_heavy(layer: &[usize], weights: &[f64]) -> Vec<usize> {
    let mut by_weight = layer.to_vec();
    by_weight.sort_by(|a, b| weights[*b].total_cmp(&weights[*a]).then(a.cmp(b)));

    let mut ordered = VecDeque::with_capacity(by_weight.len());
    for (i, idx) in by_weight.into_iter().enumerate() {
        if i % 2 == 0 {
            ordered.push_back(idx);
        } else {
            ordered.push_front(idx);
        }
    }
    Vec::from(ordered)
}

/// Centred slot of every node within its layer
fn slots(layers: &[Vec<usize>], count: usize) -> Vec<f64> {
    let mut slots = vec![0.0; count];
    for layer in layers {
        let mid = (layer.len() as f64 - 1.0) / 2.0;
        for (slot, &idx) in layer.iter().enumerate() {
            slots[idx] = slot as f64 - mid;
        }
    }
    slots
}

/// Crossings among edges that join adjacent ranks
fn count_crossings(layers: &[Vec<usize>], ranks: &[usize], links: &[(usize, usize)]) -> usize {
    let slots = slots(layers, ranks.len());
    let mut spans: Vec<Vec<(f64, f64)>> = vec![Vec::new(); layers.len()];

    for &(source, target) in links {
        let (upper, lower) = if ranks[source] < ranks[target] {
            (source, target)
        } else {
            (target, source)
        };
        if ranks[lower] == ranks[upper] + 1 {
            spans[ranks[upper]].push((slots[upper], slots[lower]));
        }
    }

    spans
        .iter()
        .map(|edges| {
            let mut crossings = 0;
            for (i, a) in edges.iter().enumerate() {
                for b in &edges[i + 1..] {
                    if (a.0 < b.0 && a.1 > b.1) || (a.0 > b.0 && a.1 < b.1) {
                        crossings += 1;
                    }
                }
            }
            crossings
        })
        .sum()
}

/// Sort one layer by the mean slot of each node's neighbours
fn reorder(layers: &mut [Vec<usize>], rank: usize, neighbours: &[Vec<usize>]) {
    let slots = slots(layers, neighbours.len());
    let key = |idx: usize| {
        let around = &neighbours[idx];
        if around.is_empty() {
            slots[idx]
        } else {
            around.iter().map(|&n| slots[n]).sum::<f64>() / around.len() as f64
        }
    };

    layers[rank].sort_by(|a, b| {
        key(*a)
            .total_cmp(&key(*b))
            .then(slots[*a].total_cmp(&slots[*b]))
    });
}

/// Barycenter sweeps; returns how many sweeps ran
fn order_layers(
    layers: &mut [Vec<usize>],
    ranks: &[usize],
    links: &[(usize, usize)],
    sweeps: usize,
    deadline: &Deadline,
) -> Result<usize> {
    let count = ranks.len();
    let mut above = vec![Vec::new(); count];
    let mut below = vec![Vec::new(); count];
    for &(source, target) in links {
        if ranks[source] < ranks[target] {
            above[target].push(source);
            below[source].push(target);
        } else if ranks[target] < ranks[source] {
            above[source].push(target);
            below[target].push(source);
        }
    }

    let mut best = layers.to_vec();
    let mut best_crossings = count_crossings(layers, ranks, links);
    let mut ran = 0;

    while ran < sweeps && best_crossings > 0 {
        deadline.check("layout")?;
        ran += 1;

        for rank in 1..layers.len() {
            reorder(layers, rank, &above);
        }
        for rank in (0..layers.len().saturating_sub(1)).rev() {
            reorder(layers, rank, &below);
        }

        let crossings = count_crossings(layers, ranks, links);
        if crossings >= best_crossings {
            layers.clone_from_slice(&best);
            break;
        }
        best_crossings = crossings;
        best = layers.to_vec();
    }

    Ok(ran)
}

fn assign_coordinates(graph: &mut Graph, layers: &[Vec<usize>], config: &LayoutConfig) {
    let horizontal = config.direction == Direction::LeftRight;
    // (along the rank, across ranks)
    let sizes: Vec<(f64, f64)> = graph
        .nodes
        .iter()
        .map(|node| {
            if horizontal {
                (node.style.height, node.style.width)
            } else {
                (node.style.width, node.style.height)
            }
        })
        .collect();

    let mut main = 0.0;
    for layer in layers {
        let depth = layer.iter().map(|&idx| sizes[idx].1).fold(0.0, f64::max);
        let total = layer.iter().map(|&idx| sizes[idx].0).sum::<f64>()
            + config.node_separation * layer.len().saturating_sub(1) as f64;

        let mut cursor = -total / 2.0;
        for &idx in layer {
            let size = sizes[idx].0;
            let cross = cursor + size / 2.0;
            cursor += size + config.node_separation;

            graph.nodes[idx].position = if horizontal {
                Position::new(main, cross)
            } else {
                Position::new(cross, main)
            };
        }

        main += depth + config.rank_separation;
    }
}
