//! Spatial indexing for neighbour queries during layout optimization

mod quadtree;

pub use quadtree::{QuadTree, Rect};
