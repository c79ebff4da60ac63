use rayon::prelude::*;
use tracing::trace;

use crate::clock::Deadline;
use crate::constants::layout::PARALLEL_THRESHOLD;
use crate::error::Result;
use crate::graph::Position;
use crate::spatial::QuadTree;

/// Below this two nodes are treated as coincident
const COINCIDENT: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct SpacingSettings {
    pub min_distance: f64,
    pub max_iterations: usize,
    pub convergence: f64,
    pub capacity: usize,
}

/// Push apart nodes closer than `min_distance`
///
/// Each iteration rebuilds a quadtree over the current positions and moves
/// every node away from each neighbour inside the threshold by half the
/// shortfall, scaled by a damping factor that decays linearly to zero over
/// the iteration budget. Stops early once an iteration's total movement
/// falls below `convergence`. Returns the number of iterations run.
pub fn adjust_spacing(
    positions: &mut [Position],
    settings: &SpacingSettings,
    deadline: &Deadline,
) -> Result<usize> {
    if positions.len() < 2 || settings.max_iterations == 0 {
        return Ok(0);
    }

    let mut iterations = 0;
    for iteration in 0..settings.max_iterations {
        deadline.check("optimize")?;

        let damping = 1.0 - iteration as f64 / settings.max_iterations as f64;
        let tree = QuadTree::from_positions(positions, settings.capacity);
        let snapshot: &[Position] = positions;

        let shifts: Vec<(f64, f64)> = if snapshot.len() >= PARALLEL_THRESHOLD {
            (0..snapshot.len())
                .into_par_iter()
                .map(|i| shift_for(i, snapshot, &tree, settings.min_distance, damping))
                .collect()
        } else {
            (0..snapshot.len())
                .map(|i| shift_for(i, snapshot, &tree, settings.min_distance, damping))
                .collect()
        };

        let mut movement = 0.0;
        for (p, (dx, dy)) in positions.iter_mut().zip(shifts) {
            p.x += dx;
            p.y += dy;
            movement += (dx * dx + dy * dy).sqrt();
        }

        iterations = iteration + 1;
        if movement < settings.convergence {
            break;
        }
    }

    trace!(iterations, "spacing adjusted");
    Ok(iterations)
}

fn shift_for(
    i: usize,
    positions: &[Position],
    tree: &QuadTree,
    min_distance: f64,
    damping: f64,
) -> (f64, f64) {
    let p = positions[i];
    let mut shift = (0.0, 0.0);

    for (j, q) in tree.query_radius(p, min_distance) {
        if j == i {
            continue;
        }
        let (dx, dy) = (p.x - q.x, p.y - q.y);
        let distance = (dx * dx + dy * dy).sqrt();
        if distance >= min_distance {
            continue;
        }

        let (ux, uy) = if distance < COINCIDENT {
            // Split coincident pairs along a direction fixed by the pair
            let (lo, hi) = (i.min(j), i.max(j));
            let angle = (hi - lo) as f64 * 2.399_963;
            let sign = if i == lo { -1.0 } else { 1.0 };
            (sign * angle.cos(), sign * angle.sin())
        } else {
            (dx / distance, dy / distance)
        };

        let push = (min_distance - distance) / 2.0 * damping;
        shift.0 += ux * push;
        shift.1 += uy * push;
    }

    shift
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SpacingSettings {
        SpacingSettings {
            min_distance: 50.0,
            max_iterations: 50,
            convergence: 0.1,
            capacity: 4,
        }
    }

    fn min_pair_distance(positions: &[Position]) -> f64 {
        let mut min = f64::INFINITY;
        for (i, p) in positions.iter().enumerate() {
            for q in &positions[i + 1..] {
                min = min.min(p.distance_to(q));
            }
        }
        min
    }

    #[test]
    fn test_crowded_nodes_are_pushed_apart() {
        let mut positions: Vec<Position> = (0..9)
            .map(|i| Position::new((i % 3) as f64 * 10.0, (i / 3) as f64 * 10.0))
            .collect();

        let iterations = adjust_spacing(&mut positions, &settings(), &Deadline::unbounded()).unwrap();

        assert!(iterations > 0);
        assert!(min_pair_distance(&positions) > 10.0);
    }

    #[test]
    fn test_well_spaced_nodes_do_not_move() {
        let mut positions: Vec<Position> = (0..9)
            .map(|i| Position::new((i % 3) as f64 * 100.0, (i / 3) as f64 * 100.0))
            .collect();
        let original = positions.clone();

        let iterations = adjust_spacing(&mut positions, &settings(), &Deadline::unbounded()).unwrap();

        assert_eq!(iterations, 1);
        assert_eq!(positions, original);
    }

    #[test]
    fn test_coincident_nodes_split() {
        let mut positions = vec![Position::new(0.0, 0.0); 2];

        adjust_spacing(&mut positions, &settings(), &Deadline::unbounded()).unwrap();

        assert!(positions[0].distance_to(&positions[1]) > 1.0);
    }
}
