use tracing::trace;

use crate::clock::Deadline;
use crate::error::Result;
use crate::graph::Position;

/// Determinants smaller than this are treated as parallel segments
const PARALLEL_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrossingStats {
    /// Crossings found on the first pass
    pub detected: usize,
    /// Endpoint swaps that lowered the local crossing count
    pub resolved: usize,
}

/// Parametric segment intersection, excluding touching endpoints
pub fn segments_intersect(a: Position, b: Position, c: Position, d: Position) -> bool {
    let (rx, ry) = (b.x - a.x, b.y - a.y);
    let (sx, sy) = (d.x - c.x, d.y - c.y);
    let det = rx * sy - ry * sx;
    if det.abs() < PARALLEL_EPSILON {
        return false;
    }

    let (qx, qy) = (c.x - a.x, c.y - a.y);
    let t = (qx * sy - qy * sx) / det;
    let u = (qx * ry - qy * rx) / det;

    t > 0.0 && t < 1.0 && u > 0.0 && u < 1.0
}

fn shares_endpoint(e: (usize, usize), f: (usize, usize)) -> bool {
    e.0 == f.0 || e.0 == f.1 || e.1 == f.0 || e.1 == f.1
}

fn links_cross(positions: &[Position], e: (usize, usize), f: (usize, usize)) -> bool {
    !shares_endpoint(e, f)
        && segments_intersect(positions[e.0], positions[e.1], positions[f.0], positions[f.1])
}

/// Every crossing between two edges of the graph
pub fn count_crossings(positions: &[Position], links: &[(usize, usize)]) -> usize {
    let mut crossings = 0;
    for (i, &e) in links.iter().enumerate() {
        for &f in &links[i + 1..] {
            if links_cross(positions, e, f) {
                crossings += 1;
            }
        }
    }
    crossings
}

/// Crossings involving at least one edge incident to `u` or `v`
fn crossings_touching(positions: &[Position], links: &[(usize, usize)], u: usize, v: usize) -> usize {
    let touches = |e: (usize, usize)| e.0 == u || e.1 == u || e.0 == v || e.1 == v;
    let mut crossings = 0;

    for (i, &e) in links.iter().enumerate() {
        if !touches(e) {
            continue;
        }
        for (j, &f) in links.iter().enumerate() {
            if i == j || (touches(f) && j < i) {
                continue;
            }
            if links_cross(positions, e, f) {
                crossings += 1;
            }
        }
    }
    crossings
}

/// Swap two nodes' positions if that strictly lowers their crossings
fn try_swap(
    positions: &mut [Position],
    ranks: &[Option<usize>],
    links: &[(usize, usize)],
    u: usize,
    v: usize,
) -> bool {
    if u == v || ranks[u] != ranks[v] {
        return false;
    }

    let before = crossings_touching(positions, links, u, v);
    positions.swap(u, v);
    let after = crossings_touching(positions, links, u, v);

    if after < before {
        true
    } else {
        positions.swap(u, v);
        false
    }
}

fn angle(positions: &[Position], (source, target): (usize, usize)) -> f64 {
    let (s, t) = (positions[source], positions[target]);
    (t.y - s.y).atan2(t.x - s.x)
}

/// Greedy crossing reduction by endpoint swaps
///
/// Edges are visited in order of their angle and each pair is tested for
/// intersection, up to `max_pairs` tests per round. A crossing is resolved
/// by swapping the positions of the two targets (or failing that, the two
/// sources) when both sit on the same rank and the swap strictly lowers the
/// crossings around them. Rounds repeat until one makes no swap, so the
/// result is a fixed point a second run leaves alone.
pub fn reduce_crossings(
    positions: &mut [Position],
    ranks: &[Option<usize>],
    links: &[(usize, usize)],
    max_pairs: usize,
    rounds: usize,
    deadline: &Deadline,
) -> Result<CrossingStats> {
    let mut stats = CrossingStats::default();

    for round in 0..rounds {
        deadline.check("optimize")?;

        let angles: Vec<f64> = links.iter().map(|&link| angle(positions, link)).collect();
        let mut order: Vec<usize> = (0..links.len()).collect();
        order.sort_by(|a, b| angles[*a].total_cmp(&angles[*b]).then(a.cmp(b)));

        let mut checked = 0;
        let mut swapped = false;

        'pairs: for (x, &e) in order.iter().enumerate() {
            for &f in &order[x + 1..] {
                if checked >= max_pairs {
                    break 'pairs;
                }
                checked += 1;

                let (first, second) = (links[e], links[f]);
                if !links_cross(positions, first, second) {
                    continue;
                }
                if round == 0 {
                    stats.detected += 1;
                }

                if try_swap(positions, ranks, links, first.1, second.1)
                    || try_swap(positions, ranks, links, first.0, second.0)
                {
                    stats.resolved += 1;
                    swapped = true;
                }
            }
        }

        trace!(round, checked, resolved = stats.resolved, "crossing reduction round");

        if !swapped {
            break;
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn test_crossing_segments_intersect() {
        assert!(segments_intersect(p(0.0, 0.0), p(10.0, 10.0), p(0.0, 10.0), p(10.0, 0.0)));
    }

    #[test]
    fn test_parallel_segments_never_intersect() {
        assert!(!segments_intersect(p(0.0, 0.0), p(10.0, 0.0), p(0.0, 5.0), p(10.0, 5.0)));
        assert!(!segments_intersect(p(0.0, 0.0), p(10.0, 0.0), p(2.0, 0.0), p(8.0, 0.0)));
    }

    #[test]
    fn test_touching_endpoints_do_not_count() {
        assert!(!segments_intersect(p(0.0, 0.0), p(10.0, 0.0), p(10.0, 0.0), p(10.0, 10.0)));
    }

    #[test]
    fn test_swap_resolves_a_crossing() {
        // 0 -> 3 and 1 -> 2 cross; 2 and 3 share a rank
        let mut positions = vec![p(0.0, 0.0), p(100.0, 0.0), p(0.0, 100.0), p(100.0, 100.0)];
        let ranks = vec![Some(0), Some(0), Some(1), Some(1)];
        let links = vec![(0, 3), (1, 2)];
        assert_eq!(count_crossings(&positions, &links), 1);

        let stats =
            reduce_crossings(&mut positions, &ranks, &links, 1000, 4, &Deadline::unbounded())
                .unwrap();

        assert_eq!(stats.detected, 1);
        assert_eq!(stats.resolved, 1);
        assert_eq!(count_crossings(&positions, &links), 0);
    }

    #[test]
    fn test_nodes_on_different_ranks_are_not_swapped() {
        let mut positions = vec![p(0.0, 0.0), p(100.0, 0.0), p(0.0, 100.0), p(100.0, 100.0)];
        let original = positions.clone();
        let ranks = vec![Some(0), Some(1), Some(2), Some(3)];
        let links = vec![(0, 3), (1, 2)];

        let stats =
            reduce_crossings(&mut positions, &ranks, &links, 1000, 4, &Deadline::unbounded())
                .unwrap();

        assert_eq!(stats.resolved, 0);
        assert_eq!(positions, original);
    }

    #[test]
    fn test_pair_budget_bounds_work() {
        let mut positions = vec![p(0.0, 0.0), p(100.0, 0.0), p(0.0, 100.0), p(100.0, 100.0)];
        let ranks = vec![None; 4];
        let links = vec![(0, 3), (1, 2)];

        let stats =
            reduce_crossings(&mut positions, &ranks, &links, 0, 4, &Deadline::unbounded()).unwrap();

        assert_eq!(stats, CrossingStats::default());
    }
}
