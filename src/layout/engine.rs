//! LayoutEngine - force-directed simulation over the working graph.
//!
//! The engine stores the working graph's topology using petgraph's
//! StableGraph and keeps positions, velocities and force accumulators in SoA
//! (Structure of Arrays) buffers indexed by slot, ready for zero-copy upload.
//!
//! Each step while `alpha > alpha_min`:
//! 1. springs along every edge,
//! 2. Barnes–Hut repulsion between all nodes,
//! 3. centering of the free nodes,
//! 4. integration: `v = (v + F) * velocity_decay`, `p += v * alpha`
//!    (fixed nodes copy their fixed coordinates instead),
//! 5. `alpha += (alpha_target - alpha) * alpha_decay`.
//!
//! Once alpha drops to `alpha_min` the engine is settled and steps are no-ops
//! until a pin or a structural change reheats it.

use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::{Directed, Direction};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::config::LayoutConfig;
use super::forces::{self, Buffers, Spring};
use crate::error::{Error, Result};
use crate::event::LayoutEvent;
use crate::graph::{EdgeKind, Graph, NodeId, NodeState, Point};
use crate::spatial::{HitIndex, SpatialIndex};

/// Whether the simulation is still moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Running,
    Settled,
}

/// Global energy of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
    pub alpha: f64,
    pub alpha_min: f64,
    pub alpha_decay: f64,
    pub alpha_target: f64,
    pub velocity_decay: f64,
    pub phase: Phase,
    /// Steps taken since the engine was created.
    pub steps: u64,
}

/// Per-slot state carried across a working-graph swap.
#[derive(Clone, Copy)]
struct Carried {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    fixed: Option<Point>,
    state: NodeState,
}

/// The force-directed layout engine.
///
/// This struct manages:
/// - Working graph and its topology via petgraph
/// - Position/velocity/force buffers in SoA layout
/// - Fixed positions and node state (pinned, selected)
/// - Barnes–Hut index for repulsion, R-tree for hit testing
/// - The alpha state machine and its event queue
pub struct LayoutEngine {
    config: LayoutConfig,

    /// Working graph as handed in; positions are written on snapshot.
    graph: Graph,

    /// Topology with one petgraph node per slot; node weights are ids.
    topology: StableGraph<NodeId, EdgeKind, Directed>,

    /// Map from node id to petgraph NodeIndex
    slots: HashMap<NodeId, NodeIndex>,

    pos_x: Vec<f64>,
    pos_y: Vec<f64>,
    vel_x: Vec<f64>,
    vel_y: Vec<f64>,
    force_x: Vec<f64>,
    force_y: Vec<f64>,
    fixed: Vec<Option<Point>>,
    states: Vec<NodeState>,

    springs: Vec<Spring>,

    /// Rebuilt every step
    quadtree: SpatialIndex,

    /// Rebuilt lazily for hit testing
    hits: HitIndex,
    hits_dirty: bool,

    simulation: SimulationState,
    rng: StdRng,
    events: Vec<LayoutEvent>,
}

impl LayoutEngine {
    /// Create an engine with an empty working graph.
    pub fn new(config: LayoutConfig) -> Result<Self> {
        config.validate()?;
        let simulation = SimulationState {
            alpha: config.alpha,
            alpha_min: config.alpha_min,
            alpha_decay: config.alpha_decay,
            alpha_target: config.alpha_target,
            velocity_decay: config.velocity_decay,
            phase: Phase::Running,
            steps: 0,
        };
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            graph: Graph::new(),
            topology: StableGraph::new(),
            slots: HashMap::new(),
            pos_x: Vec::new(),
            pos_y: Vec::new(),
            vel_x: Vec::new(),
            vel_y: Vec::new(),
            force_x: Vec::new(),
            force_y: Vec::new(),
            fixed: Vec::new(),
            states: Vec::new(),
            springs: Vec::new(),
            quadtree: SpatialIndex::new(),
            hits: HitIndex::new(),
            hits_dirty: false,
            simulation,
            events: Vec::new(),
        })
    }

    // =========================================================================
    // Working Graph
    // =========================================================================

    /// Swap in a new working graph.
    ///
    /// Nodes present in both graphs keep their position, velocity, fixed
    /// position and state; new nodes get a random position near the canvas
    /// center. A change in the node or edge set reheats the simulation;
    /// returns whether it did.
    pub fn set_graph(&mut self, graph: Graph) -> Result<bool> {
        graph.validate()?;
        let structural = !self.graph.same_elements(&graph);

        let mut carried: HashMap<NodeId, Carried> = HashMap::with_capacity(self.slots.len());
        for (id, index) in self.slots.drain() {
            let i = index.index();
            carried.insert(
                id,
                Carried {
                    x: self.pos_x[i],
                    y: self.pos_y[i],
                    vx: self.vel_x[i],
                    vy: self.vel_y[i],
                    fixed: self.fixed[i],
                    state: self.states[i],
                },
            );
        }

        let node_count = graph.node_count();
        let edge_count = graph.edge_count();
        self.topology = StableGraph::with_capacity(node_count, edge_count);
        self.slots.reserve(node_count);
        for buffer in [
            &mut self.pos_x,
            &mut self.pos_y,
            &mut self.vel_x,
            &mut self.vel_y,
            &mut self.force_x,
            &mut self.force_y,
        ] {
            buffer.clear();
            buffer.reserve(node_count);
        }
        self.fixed.clear();
        self.states.clear();

        // Slot order follows id order so layouts are reproducible per seed.
        let mut ids: Vec<&NodeId> = graph.nodes().map(|node| &node.id).collect();
        ids.sort();

        let (cx, cy) = self.config.center();
        let mut kept = 0usize;
        for id in ids {
            let index = self.topology.add_node(id.clone());
            self.slots.insert(id.clone(), index);

            let carry = match carried.get(id) {
                Some(carry) => {
                    kept += 1;
                    *carry
                }
                None => {
                    let radius = self.config.initial_radius * self.rng.r#gen::<f64>().sqrt();
                    let angle = std::f64::consts::TAU * self.rng.r#gen::<f64>();
                    Carried {
                        x: cx + radius * angle.cos(),
                        y: cy + radius * angle.sin(),
                        vx: 0.0,
                        vy: 0.0,
                        fixed: None,
                        state: NodeState::new(),
                    }
                }
            };
            self.pos_x.push(carry.x);
            self.pos_y.push(carry.y);
            self.vel_x.push(carry.vx);
            self.vel_y.push(carry.vy);
            self.force_x.push(0.0);
            self.force_y.push(0.0);
            self.fixed.push(carry.fixed);
            self.states.push(carry.state);
        }

        for edge in graph.edges() {
            let source = self.slot_index(edge.source_id.as_str())?;
            let target = self.slot_index(edge.target_id.as_str())?;
            self.topology.add_edge(source, target, edge.kind);
        }

        let degree = self.degrees();
        self.springs = self
            .topology
            .edge_references()
            .map(|edge| Spring::new(edge.source().index(), edge.target().index(), &degree))
            .collect();

        self.graph = graph;
        self.hits_dirty = true;
        self.sync_alpha_target();

        tracing::debug!(
            nodes = node_count,
            edges = edge_count,
            kept,
            structural,
            "swapped working graph"
        );
        if structural {
            self.reheat();
        }
        Ok(structural)
    }

    /// The working graph, without live positions.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The working graph with live positions, velocities and fixed positions.
    pub fn snapshot(&self) -> Graph {
        let mut graph = self.graph.clone();
        for (id, &index) in &self.slots {
            let i = index.index();
            if let Some(node) = graph.node_mut(id.as_str()) {
                node.position = Point::new(self.pos_x[i], self.pos_y[i]);
                node.velocity = Point::new(self.vel_x[i], self.vel_y[i]);
                node.fixed_position = self.fixed[i];
            }
        }
        graph
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Advance the simulation by one step and return the resulting phase.
    ///
    /// A settled engine does nothing.
    pub fn step(&mut self) -> Phase {
        if self.simulation.phase == Phase::Settled {
            return Phase::Settled;
        }

        self.apply_forces();
        self.integrate();

        let sim = &mut self.simulation;
        sim.alpha += (sim.alpha_target - sim.alpha) * sim.alpha_decay;
        sim.steps += 1;
        self.hits_dirty = true;
        tracing::trace!(alpha = sim.alpha, step = sim.steps, "layout step");

        if sim.alpha <= sim.alpha_min {
            sim.phase = Phase::Settled;
            let steps = sim.steps;
            tracing::debug!(steps, nodes = self.pos_x.len(), "layout settled");
            self.emit(LayoutEvent::Settle { steps });
        }
        self.simulation.phase
    }

    /// Step until settled or `max_steps` have run. Returns the steps taken.
    pub fn run(&mut self, max_steps: usize) -> usize {
        let mut taken = 0;
        while taken < max_steps && self.simulation.phase == Phase::Running {
            self.step();
            taken += 1;
        }
        taken
    }

    fn apply_forces(&mut self) {
        self.force_x.fill(0.0);
        self.force_y.fill(0.0);

        self.quadtree.build(
            self.pos_x
                .iter()
                .zip(&self.pos_y)
                .map(|(&x, &y)| (x, y, 1.0)),
        );

        let free: Vec<bool> = self.fixed.iter().map(Option::is_none).collect();
        let (cx, cy) = self.config.center();
        let mut buffers = Buffers {
            pos_x: &self.pos_x,
            pos_y: &self.pos_y,
            force_x: &mut self.force_x,
            force_y: &mut self.force_y,
        };
        forces::apply_springs(&self.springs, self.config.link_distance, &mut buffers);
        forces::apply_many_body(
            &self.quadtree,
            self.config.charge_strength,
            self.config.theta,
            self.config.distance_min,
            &mut buffers,
        );
        forces::apply_centering(&free, cx, cy, self.config.center_strength, &mut buffers);
    }

    fn integrate(&mut self) {
        let alpha = self.simulation.alpha;
        let decay = self.simulation.velocity_decay;
        let max_velocity = self.config.max_velocity;

        for i in 0..self.pos_x.len() {
            if let Some(fixed) = self.fixed[i] {
                self.pos_x[i] = fixed.x;
                self.pos_y[i] = fixed.y;
                self.vel_x[i] = 0.0;
                self.vel_y[i] = 0.0;
                continue;
            }

            let mut vx = (self.vel_x[i] + self.force_x[i]) * decay;
            let mut vy = (self.vel_y[i] + self.force_y[i]) * decay;
            let speed = (vx * vx + vy * vy).sqrt();
            if speed > max_velocity {
                let scale = max_velocity / speed;
                vx *= scale;
                vy *= scale;
            }
            self.vel_x[i] = vx;
            self.vel_y[i] = vy;
            self.pos_x[i] += vx * alpha;
            self.pos_y[i] += vy * alpha;
        }
    }

    /// Raise alpha to at least the reheat floor and resume stepping.
    pub fn reheat(&mut self) {
        let sim = &mut self.simulation;
        sim.alpha = sim.alpha.max(self.config.reheat_alpha);
        sim.phase = if sim.alpha > sim.alpha_min {
            Phase::Running
        } else {
            Phase::Settled
        };
        let alpha = sim.alpha;
        tracing::debug!(alpha, "layout reheated");
        self.emit(LayoutEvent::Reheat { alpha });
    }

    /// Hold alpha up while any node is pinned.
    fn sync_alpha_target(&mut self) {
        let pinned = self.states.iter().any(|state| state.is_pinned());
        self.simulation.alpha_target = if pinned {
            self.config.interaction_alpha_target
        } else {
            self.config.alpha_target
        };
    }

    /// Current simulation state.
    pub fn simulation(&self) -> &SimulationState {
        &self.simulation
    }

    /// Current alpha.
    pub fn alpha(&self) -> f64 {
        self.simulation.alpha
    }

    /// True once alpha has dropped to the settle threshold.
    pub fn is_settled(&self) -> bool {
        self.simulation.phase == Phase::Settled
    }

    /// Active configuration.
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    // =========================================================================
    // Pinning
    // =========================================================================

    /// Fix a node at `(x, y)` and reheat.
    pub fn pin(&mut self, id: &str, x: f64, y: f64) -> Result<()> {
        let i = self.fixed_slot(id, x, y)?;
        self.fixed[i] = Some(Point::new(x, y));
        self.pos_x[i] = x;
        self.pos_y[i] = y;
        self.vel_x[i] = 0.0;
        self.vel_y[i] = 0.0;
        self.states[i].set_pinned(true);
        self.hits_dirty = true;
        self.sync_alpha_target();
        self.reheat();
        Ok(())
    }

    /// Move a pinned node's fixed position. An unpinned node is pinned first.
    pub fn drag(&mut self, id: &str, x: f64, y: f64) -> Result<()> {
        let i = self.fixed_slot(id, x, y)?;
        if !self.states[i].is_pinned() {
            return self.pin(id, x, y);
        }
        self.fixed[i] = Some(Point::new(x, y));
        self.pos_x[i] = x;
        self.pos_y[i] = y;
        self.hits_dirty = true;
        Ok(())
    }

    /// Clear a node's fixed position; it resumes from there at rest.
    ///
    /// Returns `false` when the node was not pinned.
    pub fn release(&mut self, id: &str) -> Result<bool> {
        let i = self.slot_index(id)?.index();
        if !self.states[i].is_pinned() {
            return Ok(false);
        }
        self.fixed[i] = None;
        self.vel_x[i] = 0.0;
        self.vel_y[i] = 0.0;
        self.states[i].set_pinned(false);
        self.sync_alpha_target();
        Ok(true)
    }

    /// Check if a node is pinned.
    pub fn is_pinned(&self, id: &str) -> bool {
        self.slots
            .get(id)
            .map(|&index| self.states[index.index()].is_pinned())
            .unwrap_or(false)
    }

    fn fixed_slot(&self, id: &str, x: f64, y: f64) -> Result<usize> {
        if !x.is_finite() || !y.is_finite() {
            return Err(Error::NonFiniteCoordinate { x, y });
        }
        Ok(self.slot_index(id)?.index())
    }

    // =========================================================================
    // Selection State
    // =========================================================================

    /// Mark exactly the given ids as explicitly selected.
    pub fn mark_selected<S: AsRef<str>>(&mut self, selected: &[S]) {
        for state in &mut self.states {
            state.set_selected(false);
        }
        for id in selected {
            if let Some(&index) = self.slots.get(id.as_ref()) {
                self.states[index.index()].set_selected(true);
            }
        }
    }

    /// Check if a node was explicitly selected.
    pub fn is_selected(&self, id: &str) -> bool {
        self.slots
            .get(id)
            .map(|&index| self.states[index.index()].is_selected())
            .unwrap_or(false)
    }

    // =========================================================================
    // Buffer Access
    // =========================================================================

    /// Node ids in slot order, matching the position buffers.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.topology
            .node_indices()
            .filter_map(|index| self.topology.node_weight(index))
    }

    /// Get X positions slice.
    pub fn positions_x(&self) -> &[f64] {
        &self.pos_x
    }

    /// Get Y positions slice.
    pub fn positions_y(&self) -> &[f64] {
        &self.pos_y
    }

    /// Get X velocities slice.
    pub fn velocities_x(&self) -> &[f64] {
        &self.vel_x
    }

    /// Get Y velocities slice.
    pub fn velocities_y(&self) -> &[f64] {
        &self.vel_y
    }

    /// Get a node's position.
    pub fn position(&self, id: &str) -> Option<Point> {
        self.slots.get(id).map(|&index| {
            let i = index.index();
            Point::new(self.pos_x[i], self.pos_y[i])
        })
    }

    /// Get a node's velocity.
    pub fn velocity(&self, id: &str) -> Option<Point> {
        self.slots.get(id).map(|&index| {
            let i = index.index();
            Point::new(self.vel_x[i], self.vel_y[i])
        })
    }

    /// Get a node's fixed position, if pinned.
    pub fn fixed_position(&self, id: &str) -> Option<Point> {
        self.slots
            .get(id)
            .and_then(|&index| self.fixed[index.index()])
    }

    /// Get the number of nodes in the working graph.
    pub fn node_count(&self) -> usize {
        self.pos_x.len()
    }

    /// Ids adjacent to `id`, in either direction.
    pub fn neighbors(&self, id: &str) -> Vec<NodeId> {
        let Some(&index) = self.slots.get(id) else {
            return Vec::new();
        };
        let mut neighbors: Vec<NodeId> = self
            .topology
            .neighbors_undirected(index)
            .filter_map(|n| self.topology.node_weight(n).cloned())
            .collect();
        neighbors.sort();
        neighbors.dedup();
        neighbors
    }

    // =========================================================================
    // Spatial Queries
    // =========================================================================

    /// Find the node nearest to `(x, y)` within `max_distance`.
    pub fn node_at(&mut self, x: f64, y: f64, max_distance: f64) -> Option<NodeId> {
        self.ensure_hit_index();
        let slot = self.hits.nearest_within(x, y, max_distance)?;
        self.slot_id(slot)
    }

    /// Find all nodes inside a rectangle.
    pub fn nodes_in_rect(
        &mut self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    ) -> Vec<NodeId> {
        self.ensure_hit_index();
        let mut ids: Vec<NodeId> = self
            .hits
            .in_rect(min_x, min_y, max_x, max_y)
            .into_iter()
            .filter_map(|slot| self.slot_id(slot))
            .collect();
        ids.sort();
        ids
    }

    fn ensure_hit_index(&mut self) {
        if self.hits_dirty {
            self.hits.rebuild(&self.pos_x, &self.pos_y);
            self.hits_dirty = false;
        }
    }

    /// Bounding box of all nodes as `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        if self.pos_x.is_empty() {
            return None;
        }
        let mut bounds = (
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        );
        for (&x, &y) in self.pos_x.iter().zip(&self.pos_y) {
            bounds.0 = bounds.0.min(x);
            bounds.1 = bounds.1.min(y);
            bounds.2 = bounds.2.max(x);
            bounds.3 = bounds.3.max(y);
        }
        Some(bounds)
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Events queued since the last drain, oldest first.
    pub fn pending_events(&self) -> &[LayoutEvent] {
        &self.events
    }

    /// Take all events queued since the last call.
    pub fn drain_events(&mut self) -> Vec<LayoutEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: LayoutEvent) {
        // An undrained reheat or settle is replaced by the newer one.
        if !matches!(event, LayoutEvent::Diagnostic(_)) {
            let kind = std::mem::discriminant(&event);
            self.events.retain(|queued| std::mem::discriminant(queued) != kind);
        }
        self.events.push(event);
    }

    /// Drop queued diagnostics, keeping reheat and settle events.
    pub(crate) fn discard_diagnostics(&mut self) {
        self.events.retain(|event| !matches!(event, LayoutEvent::Diagnostic(_)));
    }

    // =========================================================================
    // Utilities
    // =========================================================================

    fn slot_index(&self, id: &str) -> Result<NodeIndex> {
        self.slots
            .get(id)
            .copied()
            .ok_or_else(|| Error::UnknownNode(id.to_owned()))
    }

    fn slot_id(&self, slot: usize) -> Option<NodeId> {
        self.topology.node_weight(NodeIndex::new(slot)).cloned()
    }

    /// Incident edge count per slot, counting both directions.
    fn degrees(&self) -> Vec<u32> {
        self.topology
            .node_indices()
            .map(|index| {
                let out = self.topology.edges_directed(index, Direction::Outgoing).count();
                let incoming = self.topology.edges_directed(index, Direction::Incoming).count();
                (out + incoming) as u32
            })
            .collect()
    }
}
