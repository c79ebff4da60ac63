use crate::graph::Position;

/// Deepest a tree subdivides; points piled on one spot stay in a leaf
const MAX_DEPTH: usize = 16;

/// Axis-aligned rectangle, `min` inclusive and `max` exclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Position,
    pub max: Position,
}

impl Rect {
    pub fn new(min: Position, max: Position) -> Self {
        Self { min, max }
    }

    /// Smallest square containing every point, grown by `margin`
    pub fn bounding(points: impl IntoIterator<Item = Position>, margin: f64) -> Self {
        let mut min = Position::new(f64::INFINITY, f64::INFINITY);
        let mut max = Position::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }

        if !min.is_finite() || !max.is_finite() {
            return Self::new(Position::new(-margin, -margin), Position::new(margin, margin));
        }

        let side = (max.x - min.x).max(max.y - min.y) + 2.0 * margin + 1.0;
        let min = Position::new(min.x - margin, min.y - margin);
        Self::new(min, Position::new(min.x + side, min.y + side))
    }

    pub fn contains(&self, p: &Position) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    pub fn center(&self) -> Position {
        self.min.midpoint(&self.max)
    }

    fn quadrants(&self) -> [Rect; 4] {
        let c = self.center();
        [
            Rect::new(self.min, c),
            Rect::new(Position::new(c.x, self.min.y), Position::new(self.max.x, c.y)),
            Rect::new(Position::new(self.min.x, c.y), Position::new(c.x, self.max.y)),
            Rect::new(c, self.max),
        ]
    }
}

/// Point quadtree over item ids
///
/// Each leaf holds up to `capacity` points before splitting into four
/// children. Radius queries walk only the quadrants that overlap the query
/// square, so a neighbour lookup is logarithmic for spread-out layouts.
#[derive(Debug)]
pub struct QuadTree {
    root: QuadNode,
    capacity: usize,
    len: usize,
}

#[derive(Debug)]
struct QuadNode {
    bounds: Rect,
    depth: usize,
    points: Vec<(usize, Position)>,
    children: Option<Box<[QuadNode; 4]>>,
}

impl QuadNode {
    fn new(bounds: Rect, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            points: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, id: usize, p: Position, capacity: usize) -> bool {
        if !self.bounds.contains(&p) {
            return false;
        }

        if let Some(children) = self.children.as_mut() {
            return children.iter_mut().any(|child| child.insert(id, p, capacity));
        }

        self.points.push((id, p));
        if self.points.len() > capacity && self.depth < MAX_DEPTH {
            self.subdivide(capacity);
        }
        true
    }

    fn subdivide(&mut self, capacity: usize) {
        let [a, b, c, d] = self.bounds.quadrants();
        let depth = self.depth + 1;
        let mut children = Box::new([
            QuadNode::new(a, depth),
            QuadNode::new(b, depth),
            QuadNode::new(c, depth),
            QuadNode::new(d, depth),
        ]);

        for (id, p) in self.points.drain(..) {
            for child in children.iter_mut() {
                if child.insert(id, p, capacity) {
                    break;
                }
            }
        }
        self.children = Some(children);
    }

    fn query_rect(&self, range: &Rect, out: &mut Vec<(usize, Position)>) {
        if !self.bounds.intersects(range) {
            return;
        }

        out.extend(self.points.iter().filter(|(_, p)| range.contains(p)).copied());

        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query_rect(range, out);
            }
        }
    }
}

impl QuadTree {
    pub fn new(bounds: Rect, capacity: usize) -> Self {
        Self {
            root: QuadNode::new(bounds, 0),
            capacity: capacity.max(1),
            len: 0,
        }
    }

    /// Build a tree sized to hold every position, keyed by slice index
    pub fn from_positions(positions: &[Position], capacity: usize) -> Self {
        let bounds = Rect::bounding(positions.iter().copied(), 1.0);
        let mut tree = Self::new(bounds, capacity);
        for (id, p) in positions.iter().enumerate() {
            tree.insert(id, *p);
        }
        tree
    }

    /// Returns `false` for points outside the tree's bounds
    pub fn insert(&mut self, id: usize, p: Position) -> bool {
        let inserted = p.is_finite() && self.root.insert(id, p, self.capacity);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bounds(&self) -> Rect {
        self.root.bounds
    }

    pub fn query_rect(&self, range: &Rect) -> Vec<(usize, Position)> {
        let mut out = Vec::new();
        self.root.query_rect(range, &mut out);
        out
    }

    /// Points within `radius` of `center`, inclusive
    pub fn query_radius(&self, center: Position, radius: f64) -> Vec<(usize, Position)> {
        let reach = radius + 1.0;
        let range = Rect::new(
            Position::new(center.x - reach, center.y - reach),
            Position::new(center.x + reach, center.y + reach),
        );
        let mut hits = self.query_rect(&range);
        hits.retain(|(_, p)| p.distance_to(&center) <= radius);
        hits.sort_by_key(|(id, _)| *id);
        hits
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn grid(n: usize, step: f64) -> Vec<Position> {
        (0..n * n)
            .map(|i| Position::new((i % n) as f64 * step, (i / n) as f64 * step))
            .collect()
    }

    #[test]
    fn test_holds_every_point() {
        let points = grid(10, 25.0);
        let tree = QuadTree::from_positions(&points, 4);

        assert_eq!(tree.len(), 100);
        assert_eq!(tree.query_rect(&tree.bounds()).len(), 100);
    }

    #[test]
    fn test_radius_query_matches_brute_force() {
        let points = grid(12, 17.0);
        let tree = QuadTree::from_positions(&points, 4);
        let center = Position::new(80.0, 95.0);

        let ids: Vec<usize> = tree
            .query_radius(center, 40.0)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let expected: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.distance_to(&center) <= 40.0)
            .map(|(id, _)| id)
            .collect();

        assert_eq!(ids, expected);
    }

    #[test]
    fn test_coincident_points_do_not_recurse_forever() {
        let points = vec![Position::new(5.0, 5.0); 50];
        let tree = QuadTree::from_positions(&points, 2);

        assert_eq!(tree.query_radius(Position::new(5.0, 5.0), 0.0).len(), 50);
    }

    #[test]
    fn test_rejects_points_outside_bounds() {
        let mut tree = QuadTree::new(
            Rect::new(Position::new(0.0, 0.0), Position::new(10.0, 10.0)),
            4,
        );

        assert!(!tree.insert(0, Position::new(20.0, 5.0)));
        assert!(!tree.insert(1, Position::new(f64::NAN, 5.0)));
        assert!(tree.is_empty());
    }
}
