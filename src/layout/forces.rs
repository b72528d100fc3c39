//! Force kernels.
//!
//! Every kernel adds into the shared `force_x`/`force_y` accumulators, indexed
//! by engine slot. Forces are not scaled by alpha here; the integrator scales
//! the resulting displacement instead.

use crate::spatial::SpatialIndex;

/// A spring between two slots, with precomputed stiffness and split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Spring {
    pub source: usize,
    pub target: usize,
    /// `1 / min(degree(source), degree(target))`, so hubs are pulled gently.
    pub strength: f64,
    /// Share of the correction applied to the target: the better-connected
    /// endpoint moves less.
    pub bias: f64,
}

impl Spring {
    /// Build a spring from endpoint degrees. Degrees count every incident edge.
    pub fn new(source: usize, target: usize, degree: &[u32]) -> Self {
        let ds = f64::from(degree[source].max(1));
        let dt = f64::from(degree[target].max(1));
        Self {
            source,
            target,
            strength: 1.0 / ds.min(dt),
            bias: ds / (ds + dt),
        }
    }
}

/// Mutable view over the engine's per-slot buffers.
pub(crate) struct Buffers<'a> {
    pub pos_x: &'a [f64],
    pub pos_y: &'a [f64],
    pub force_x: &'a mut [f64],
    pub force_y: &'a mut [f64],
}

/// Hooke springs toward `distance` along every edge.
pub(crate) fn apply_springs(springs: &[Spring], distance: f64, buffers: &mut Buffers<'_>) {
    for spring in springs {
        let (s, t) = (spring.source, spring.target);
        if s == t {
            continue;
        }
        let dx = buffers.pos_x[t] - buffers.pos_x[s];
        let dy = buffers.pos_y[t] - buffers.pos_y[s];
        let length = (dx * dx + dy * dy).sqrt();
        // Coincident endpoints: repulsion separates them first.
        if length == 0.0 {
            continue;
        }

        let k = (length - distance) / length * spring.strength;
        let (fx, fy) = (dx * k, dy * k);
        buffers.force_x[t] -= fx * spring.bias;
        buffers.force_y[t] -= fy * spring.bias;
        buffers.force_x[s] += fx * (1.0 - spring.bias);
        buffers.force_y[s] += fy * (1.0 - spring.bias);
    }
}

/// Pairwise inverse-square repulsion, approximated through the quadtree.
///
/// The index must have been built from the same slots, in slot order.
pub(crate) fn apply_many_body(
    index: &SpatialIndex,
    strength: f64,
    theta: f64,
    distance_min: f64,
    buffers: &mut Buffers<'_>,
) {
    let distance_min_sq = distance_min * distance_min;
    for slot in 0..index.len() {
        let (mut fx, mut fy) = (0.0, 0.0);
        index.for_each_interaction(slot, theta, |hit| {
            let mut l = hit.distance_sq;
            if l == 0.0 {
                return;
            }
            if l < distance_min_sq {
                l = (distance_min_sq * l).sqrt();
            }
            let w = strength * hit.weight / l;
            fx += hit.dx * w;
            fy += hit.dy * w;
        });
        buffers.force_x[slot] += fx;
        buffers.force_y[slot] += fy;
    }
}

/// Pull the centroid of the free slots toward `(cx, cy)`.
pub(crate) fn apply_centering(
    free: &[bool],
    cx: f64,
    cy: f64,
    strength: f64,
    buffers: &mut Buffers<'_>,
) {
    let mut count = 0usize;
    let (mut sx, mut sy) = (0.0, 0.0);
    for (slot, _) in free.iter().enumerate().filter(|(_, free)| **free) {
        sx += buffers.pos_x[slot];
        sy += buffers.pos_y[slot];
        count += 1;
    }
    if count == 0 {
        return;
    }

    let shift_x = (cx - sx / count as f64) * strength;
    let shift_y = (cy - sy / count as f64) * strength;
    for (slot, _) in free.iter().enumerate().filter(|(_, free)| **free) {
        buffers.force_x[slot] += shift_x;
        buffers.force_y[slot] += shift_y;
    }
}
