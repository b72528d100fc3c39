//! Barnes–Hut point-region quadtree.
//!
//! Rebuilt from scratch every simulation step. Each cell tracks the total
//! weight and weighted center of the points below it, so a far-away cell can
//! stand in for all of its points in a single interaction:
//!
//! - A cell is *far* from a query point when `size / distance < theta` and the
//!   point does not lie inside it; it is visited once, as an aggregate.
//! - Otherwise its children (or its leaf points) are visited individually.
//!
//! With `theta = 0` every interaction is exact. Buffers are cleared, not
//! reallocated, between builds, so peak memory stays O(n).

use std::collections::HashMap;

/// Subdivision stops at this depth; deeper points share a leaf bucket.
const MAX_DEPTH: u8 = 48;

/// Offset scale applied to coincident points.
const JITTER: f64 = 1e-6;

/// Golden angle in radians, spreads successive jitter offsets around a spiral.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// One point/point or point/cluster interaction seen from a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interaction {
    /// Offset from the query point to the other point or cluster center.
    pub dx: f64,
    pub dy: f64,
    /// Weight of the other point, or total weight of the cluster.
    pub weight: f64,
    /// `dx² + dy²`.
    pub distance_sq: f64,
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    x0: f64,
    y0: f64,
    size: f64,
    mass: f64,
    /// Weighted coordinate sums; center of mass is `sum / mass`.
    sum_x: f64,
    sum_y: f64,
    /// Index of the first of four contiguous children.
    children: Option<usize>,
    /// Head of the intrusive point list of a leaf.
    head: Option<usize>,
    depth: u8,
}

impl Cell {
    fn leaf(x0: f64, y0: f64, size: f64, depth: u8) -> Self {
        Self {
            x0,
            y0,
            size,
            mass: 0.0,
            sum_x: 0.0,
            sum_y: 0.0,
            children: None,
            head: None,
            depth,
        }
    }

    #[inline]
    fn quadrant(&self, x: f64, y: f64) -> usize {
        let half = self.size * 0.5;
        let right = x >= self.x0 + half;
        let bottom = y >= self.y0 + half;
        usize::from(right) | (usize::from(bottom) << 1)
    }

    #[inline]
    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x0 + self.size && y >= self.y0 && y <= self.y0 + self.size
    }
}

/// Spatial partition used to approximate many-body repulsion.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    cells: Vec<Cell>,
    points: Vec<(f64, f64)>,
    weights: Vec<f64>,
    next: Vec<Option<usize>>,
    seen: HashMap<(u64, u64), u32>,
}

impl SpatialIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the tree from `(x, y, weight)` triples.
    ///
    /// Point `i` of the input keeps index `i` for [`Self::for_each_interaction`].
    /// Exactly coincident points are nudged apart by a tiny deterministic
    /// offset before insertion so subdivision always terminates.
    pub fn build<I>(&mut self, points: I)
    where
        I: IntoIterator<Item = (f64, f64, f64)>,
    {
        self.cells.clear();
        self.points.clear();
        self.weights.clear();
        self.next.clear();
        self.seen.clear();

        for (x, y, weight) in points {
            // -0.0 and 0.0 must hash alike.
            let key = ((x + 0.0).to_bits(), (y + 0.0).to_bits());
            let copies = self.seen.entry(key).or_insert(0);
            let (x, y) = if *copies == 0 {
                (x, y)
            } else {
                let k = f64::from(*copies);
                let angle = k * GOLDEN_ANGLE;
                let radius = JITTER * k.sqrt() * x.abs().max(y.abs()).max(1.0);
                (x + radius * angle.cos(), y + radius * angle.sin())
            };
            *copies += 1;

            self.points.push((x, y));
            self.weights.push(weight);
            self.next.push(None);
        }

        if self.points.is_empty() {
            return;
        }

        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &(x, y) in &self.points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        // A lone point has zero extent; give the root a unit cell.
        let size = (max_x - min_x).max(max_y - min_y).max(1.0) * (1.0 + 1e-9);

        self.cells.reserve(self.points.len() * 2);
        self.cells.push(Cell::leaf(min_x, min_y, size, 0));
        for point in 0..self.points.len() {
            self.insert(point);
        }
    }

    fn insert(&mut self, point: usize) {
        let (x, y) = self.points[point];
        let weight = self.weights[point];
        let mut cell = 0;

        loop {
            let current = &mut self.cells[cell];
            current.mass += weight;
            current.sum_x += weight * x;
            current.sum_y += weight * y;

            if let Some(first) = current.children {
                cell = first + current.quadrant(x, y);
                continue;
            }

            match current.head {
                None => {
                    current.head = Some(point);
                    return;
                }
                Some(head) if current.depth >= MAX_DEPTH => {
                    self.next[point] = Some(head);
                    self.cells[cell].head = Some(point);
                    return;
                }
                Some(resident) => {
                    let first = self.split(cell, resident);
                    cell = first + self.cells[cell].quadrant(x, y);
                }
            }
        }
    }

    /// Turn a single-point leaf into an internal cell with four children,
    /// moving its resident point down. Returns the first child index.
    fn split(&mut self, cell: usize, resident: usize) -> usize {
        let parent = self.cells[cell];
        let half = parent.size * 0.5;
        let first = self.cells.len();
        for quadrant in 0..4 {
            let x0 = parent.x0 + half * (quadrant & 1) as f64;
            let y0 = parent.y0 + half * (quadrant >> 1) as f64;
            self.cells.push(Cell::leaf(x0, y0, half, parent.depth + 1));
        }

        let (rx, ry) = self.points[resident];
        let weight = self.weights[resident];
        let child = &mut self.cells[first + parent.quadrant(rx, ry)];
        child.head = Some(resident);
        child.mass = weight;
        child.sum_x = weight * rx;
        child.sum_y = weight * ry;

        let parent = &mut self.cells[cell];
        parent.head = None;
        parent.children = Some(first);
        first
    }

    /// Visit every point or far cluster interacting with point `index`.
    ///
    /// `theta` is the Barnes–Hut opening criterion in `[0, 1]`. The point
    /// itself is never visited.
    pub fn for_each_interaction<F>(&self, index: usize, theta: f64, mut visit: F)
    where
        F: FnMut(Interaction),
    {
        if index >= self.points.len() || self.cells.is_empty() {
            return;
        }
        let (px, py) = self.points[index];
        self.visit(0, index, px, py, theta * theta, &mut visit);
    }

    fn visit<F>(&self, cell: usize, index: usize, px: f64, py: f64, theta_sq: f64, visit: &mut F)
    where
        F: FnMut(Interaction),
    {
        let current = &self.cells[cell];
        if current.mass == 0.0 {
            return;
        }

        if let Some(first) = current.children {
            let dx = current.sum_x / current.mass - px;
            let dy = current.sum_y / current.mass - py;
            let distance_sq = dx * dx + dy * dy;
            if !current.contains(px, py) && current.size * current.size < theta_sq * distance_sq {
                visit(Interaction {
                    dx,
                    dy,
                    weight: current.mass,
                    distance_sq,
                });
                return;
            }
            for child in first..first + 4 {
                self.visit(child, index, px, py, theta_sq, visit);
            }
            return;
        }

        let mut cursor = current.head;
        while let Some(point) = cursor {
            if point != index {
                let (x, y) = self.points[point];
                let (dx, dy) = (x - px, y - py);
                visit(Interaction {
                    dx,
                    dy,
                    weight: self.weights[point],
                    distance_sq: dx * dx + dy * dy,
                });
            }
            cursor = self.next[point];
        }
    }

    /// Position of point `index` after jitter.
    #[cfg(test)]
    pub fn position(&self, index: usize) -> Option<(f64, f64)> {
        self.points.get(index).copied()
    }

    /// Get the number of points in the index.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of tree cells currently allocated.
    #[cfg(test)]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}
