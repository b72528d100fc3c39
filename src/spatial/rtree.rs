//! R-tree based hit-testing index using the rstar crate.
//!
//! Lets a renderer map pointer coordinates back to layout slots:
//! - Nearest node within a pick radius
//! - Nodes inside a rectangle (box selection)

use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// A laid-out node position tagged with its engine slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotPoint {
    /// Engine slot of the node.
    pub slot: usize,
    pub x: f64,
    pub y: f64,
}

impl SlotPoint {
    /// Create a new SlotPoint.
    pub fn new(slot: usize, x: f64, y: f64) -> Self {
        Self { slot, x, y }
    }
}

impl RTreeObject for SlotPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for SlotPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

/// Hit-testing index over node positions.
///
/// Rebuilt in bulk from the engine's position buffers whenever they changed
/// since the last query.
pub struct HitIndex {
    tree: RTree<SlotPoint>,
}

impl HitIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Find the nearest slot within a maximum distance.
    pub fn nearest_within(&self, x: f64, y: f64, max_distance: f64) -> Option<usize> {
        let max_distance_sq = max_distance * max_distance;
        self.tree
            .nearest_neighbor(&[x, y])
            .filter(|point| point.distance_2(&[x, y]) <= max_distance_sq)
            .map(|point| point.slot)
    }

    /// Find all slots within a rectangle.
    pub fn in_rect(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<usize> {
        let envelope = AABB::from_corners([min_x, min_y], [max_x, max_y]);
        self.tree
            .locate_in_envelope(&envelope)
            .map(|point| point.slot)
            .collect()
    }

    /// Rebuild the index from slot-ordered coordinate buffers.
    pub fn rebuild(&mut self, xs: &[f64], ys: &[f64]) {
        let points: Vec<_> = xs
            .iter()
            .zip(ys)
            .enumerate()
            .map(|(slot, (&x, &y))| SlotPoint::new(slot, x, y))
            .collect();

        self.tree = RTree::bulk_load(points);
    }

    /// Clear all points from the index.
    #[cfg(test)]
    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    /// Get the number of points in the index.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for HitIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(points: &[(f64, f64)]) -> HitIndex {
        let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
        let mut index = HitIndex::new();
        index.rebuild(&xs, &ys);
        index
    }

    #[test]
    fn test_nearest_within() {
        let index = index(&[(0.0, 0.0), (10.0, 10.0)]);

        assert_eq!(index.nearest_within(0.0, 0.0, 5.0), Some(0));
        assert_eq!(index.nearest_within(5.0, 5.0, 1.0), None);
        // Slot 0 is ~5.66 from (4, 4).
        assert_eq!(index.nearest_within(4.0, 4.0, 8.0), Some(0));
        assert_eq!(index.nearest_within(11.0, 11.0, 2.0), Some(1));
    }

    #[test]
    fn test_in_rect() {
        let index = index(&[(0.0, 0.0), (5.0, 5.0), (10.0, 10.0)]);

        let mut hits = index.in_rect(-1.0, -1.0, 6.0, 6.0);
        hits.sort_unstable();
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn test_rebuild_and_clear() {
        let mut index = index(&[(0.0, 0.0)]);
        index.rebuild(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.nearest_within(0.0, 0.0, 10.0), Some(0));

        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.nearest_within(0.0, 0.0, 10.0), None);
    }
}
