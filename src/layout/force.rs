use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::trace;

use super::{LayoutStats, LayoutStrategy, edge_indices};
use crate::clock::Deadline;
use crate::config::{ForceSettings, LayoutConfig};
use crate::constants::layout::PARALLEL_THRESHOLD;
use crate::constants::optimizer::QUADTREE_CAPACITY;
use crate::error::Result;
use crate::graph::{Graph, Position};
use crate::spatial::QuadTree;

/// Closest two nodes are treated as being for force purposes
const MIN_DISTANCE: f64 = 0.01;

/// Seeded spring simulation for module graphs
///
/// Each step sums pairwise repulsion (inverse to distance, ignored past
/// `max_distance`), spring forces along edges toward `spring_length`, and a
/// weak pull toward the origin. Moves are capped by a cooling temperature,
/// then a collision pass pushes apart any pair closer than
/// `min_separation`. The run stops at `max_iterations` or once the summed
/// movement of a step drops below `epsilon`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceLayout;

impl LayoutStrategy for ForceLayout {
    fn name(&self) -> &'static str {
        "force"
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

        let settings = &config.force;
        let links = edge_indices(graph);
        let mut positions = initial_positions(count, settings);

        let mut temperature = settings.spring_length;
        let cooling = temperature / settings.max_iterations.max(1) as f64;
        let batch = settings.batch_size.max(1);
        let mut iterations = 0;

        while iterations < settings.max_iterations {
            let forces = net_forces(&positions, &links, settings);

            let mut movement = 0.0;
            for (p, (fx, fy)) in positions.iter_mut().zip(forces) {
                let magnitude = (fx * fx + fy * fy).sqrt();
                if magnitude > f64::EPSILON {
                    let step = magnitude.min(temperature);
                    p.x += fx / magnitude * step;
                    p.y += fy / magnitude * step;
                    movement += step;
                }
            }
            movement += separate(&mut positions, settings.min_separation);

            iterations += 1;
            temperature = (temperature - cooling).max(1.0);

            if movement < settings.epsilon {
                break;
            }

            if iterations % batch == 0 {
                deadline.check("layout")?;
                if settings.cooperative {
                    std::thread::yield_now();
                }
            }
        }

        for (node, p) in graph.nodes.iter_mut().zip(positions) {
            node.position = p;
        }

        trace!(nodes = count, iterations, "force simulation settled");

        Ok(LayoutStats { iterations })
    }
}

/// Uniform scatter over a disc sized to the node count
fn initial_positions(count: usize, settings: &ForceSettings) -> Vec<Position> {
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let radius = settings.spring_length * (count as f64).sqrt() / 2.0;

    (0..count)
        .map(|_| {
            let angle = rng.gen_range(0.0..TAU);
            let r = radius * rng.r#gen::<f64>().sqrt();
            Position::new(r * angle.cos(), r * angle.sin())
        })
        .collect()
}

fn net_forces(
    positions: &[Position],
    links: &[(usize, usize)],
    settings: &ForceSettings,
) -> Vec<(f64, f64)> {
    let mut forces: Vec<(f64, f64)> = if positions.len() >= PARALLEL_THRESHOLD {
        (0..positions.len())
            .into_par_iter()
            .map(|i| repulsion_on(i, positions, settings))
            .collect()
    } else {
        (0..positions.len())
            .map(|i| repulsion_on(i, positions, settings))
            .collect()
    };

    for &(a, b) in links {
        let dx = positions[b].x - positions[a].x;
        let dy = positions[b].y - positions[a].y;
        let distance = (dx * dx + dy * dy).sqrt().max(MIN_DISTANCE);
        let pull = (distance - settings.spring_length) * settings.spring_strength;
        let (fx, fy) = (dx / distance * pull, dy / distance * pull);

        forces[a].0 += fx;
        forces[a].1 += fy;
        forces[b].0 -= fx;
        forces[b].1 -= fy;
    }

    for (force, p) in forces.iter_mut().zip(positions) {
        force.0 -= p.x * settings.centering;
        force.1 -= p.y * settings.centering;
    }

    forces
}

/// Repulsion felt by node `i`, summed in index order
fn repulsion_on(i: usize, positions: &[Position], settings: &ForceSettings) -> (f64, f64) {
    let p = positions[i];
    let mut force = (0.0, 0.0);

    for (j, q) in positions.iter().enumerate() {
        if i == j {
            continue;
        }
        let (mut dx, mut dy) = (p.x - q.x, p.y - q.y);
        let mut distance = (dx * dx + dy * dy).sqrt();
        if distance > settings.max_distance {
            continue;
        }
        if distance < MIN_DISTANCE {
            // Coincident nodes split along a direction fixed by their indices
            let angle = (i as f64 - j as f64) * 2.399_963;
            dx = angle.cos();
            dy = angle.sin();
            distance = MIN_DISTANCE;
        } else {
            dx /= distance;
            dy /= distance;
        }

        let push = settings.repulsion / distance;
        force.0 += dx * push;
        force.1 += dy * push;
    }

    force
}

/// Push overlapping pairs apart to `min_separation`; returns total movement
fn separate(positions: &mut [Position], min_separation: f64) -> f64 {
    if min_separation <= 0.0 || positions.len() < 2 {
        return 0.0;
    }

    let tree = QuadTree::from_positions(positions, QUADTREE_CAPACITY);
    let mut shifts = vec![(0.0, 0.0); positions.len()];

    for (i, p) in positions.iter().enumerate() {
        for (j, q) in tree.query_radius(*p, min_separation) {
            if j <= i {
                continue;
            }
            let (dx, dy) = (q.x - p.x, q.y - p.y);
            let distance = (dx * dx + dy * dy).sqrt();
            let (ux, uy) = if distance < MIN_DISTANCE {
                let angle = (j - i) as f64 * 2.399_963;
                (angle.cos(), angle.sin())
            } else {
                (dx / distance, dy / distance)
            };
            let overlap = (min_separation - distance) / 2.0;

            shifts[i].0 -= ux * overlap;
            shifts[i].1 -= uy * overlap;
            shifts[j].0 += ux * overlap;
            shifts[j].1 += uy * overlap;
        }
    }

    let mut movement = 0.0;
    for (p, (sx, sy)) in positions.iter_mut().zip(shifts) {
        p.x += sx;
        p.y += sy;
        movement += (sx * sx + sy * sy).sqrt();
    }
    movement
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::InfravizError;
    use crate::layout::tests::module_graph;

    fn run(graph: &mut Graph) -> LayoutStats {
        let config = graph.layout_config.clone();
        ForceLayout
            .layout(graph, &config, &Deadline::unbounded())
            .unwrap()
    }

    #[test]
    fn test_positions_are_finite_and_spread() {
        let mut graph = module_graph(30);
        let stats = run(&mut graph);

        assert!(stats.iterations > 0);
        assert!(graph.nodes.iter().all(|n| n.position.is_finite()));

        let spread = graph
            .nodes
            .iter()
            .map(|n| n.position.distance_to(&Position::default()))
            .fold(0.0, f64::max);
        assert!(spread > 0.0);
    }

    #[test]
    fn test_same_seed_same_positions() {
        let mut first = module_graph(25);
        let mut second = module_graph(25);
        run(&mut first);
        run(&mut second);

        for (a, b) in first.nodes.iter().zip(&second.nodes) {
            assert!(a.position.distance_to(&b.position) < 1e-9);
        }
    }

    #[test]
    fn test_parallel_and_serial_forces_agree() {
        let settings = ForceSettings::default();
        let positions = initial_positions(PARALLEL_THRESHOLD + 8, &settings);

        let parallel = net_forces(&positions, &[], &settings);

        for (i, force) in parallel.iter().enumerate() {
            let (rx, ry) = repulsion_on(i, &positions, &settings);
            assert_eq!(force.0, rx - positions[i].x * settings.centering);
            assert_eq!(force.1, ry - positions[i].y * settings.centering);
        }
    }

    #[test]
    fn test_collision_pass_enforces_separation() {
        let mut positions = vec![
            Position::new(0.0, 0.0),
            Position::new(10.0, 0.0),
            Position::new(10.0, 0.0),
        ];

        for _ in 0..50 {
            separate(&mut positions, 50.0);
        }

        for (i, p) in positions.iter().enumerate() {
            for q in &positions[i + 1..] {
                assert!(p.distance_to(q) >= 49.0);
            }
        }
    }

    #[test]
    fn test_spent_deadline_aborts_simulation() {
        let mut graph = module_graph(40);
        let mut config = graph.layout_config.clone();
        config.force.batch_size = 1;
        config.force.epsilon = 0.0;
        let deadline = Deadline::new(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));

        let err = ForceLayout
            .layout(&mut graph, &config, &deadline)
            .unwrap_err();

        assert!(matches!(err, InfravizError::Timeout { .. }));
    }
}
