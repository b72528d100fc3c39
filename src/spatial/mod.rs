//! Spatial indexing.
//!
//! - `quadtree`: Barnes–Hut partition rebuilt every step for O(n log n)
//!   repulsion.
//! - `rtree`: R-tree over live positions for O(log n) hit testing.

mod quadtree;
mod rtree;

pub use quadtree::{Interaction, SpatialIndex};
pub use rtree::HitIndex;
