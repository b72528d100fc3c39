//! InteractionController - the owning facade over the pipeline.
//!
//! Holds the full graph built from the latest binding snapshot, the current
//! selection, and the layout engine running over the selected subgraph.
//! Pointer and selection events from the host are routed through here so a
//! snapshot refresh or a selection change never discards unrelated layout
//! progress.

use crate::builder::{Diagnostic, GraphBuilder};
use crate::error::Result;
use crate::event::LayoutEvent;
use crate::filter::SubgraphFilter;
use crate::graph::{BindingRecord, Graph, GraphData, NodeId};
use crate::layout::{LayoutConfig, LayoutEngine, Phase};

/// Mediates selection and pointer events into the layout engine.
pub struct InteractionController {
    builder: GraphBuilder,
    filter: SubgraphFilter,
    /// Graph built from the latest snapshot, before filtering.
    full: Graph,
    /// Explicitly selected ids; empty means everything. Ids absent from
    /// `full` are kept and contribute nothing.
    selection: Vec<NodeId>,
    engine: LayoutEngine,
}

impl InteractionController {
    /// Create a controller with an empty graph.
    pub fn new(config: LayoutConfig) -> Result<Self> {
        Ok(Self {
            builder: GraphBuilder::new(),
            filter: SubgraphFilter::new(),
            full: Graph::new(),
            selection: Vec::new(),
            engine: LayoutEngine::new(config)?,
        })
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Replace the full graph with one built from a binding snapshot.
    ///
    /// Diagnostics are queued as events, replacing any still pending from
    /// the previous snapshot. Returns how many elements were skipped.
    pub fn load(&mut self, records: &[BindingRecord]) -> Result<usize> {
        let report = self.builder.build(records)?;
        let skipped = report.diagnostics.len();
        self.engine.discard_diagnostics();
        for diagnostic in report.diagnostics {
            self.engine.emit(LayoutEvent::Diagnostic(diagnostic));
        }
        self.replace_full(report.graph)?;
        Ok(skipped)
    }

    /// Replace the full graph with a prebuilt nodes/links snapshot.
    pub fn load_graph(&mut self, data: GraphData) -> Result<()> {
        let graph = Graph::from_data(data)?;
        self.engine.discard_diagnostics();
        self.replace_full(graph)
    }

    /// Swap in a new full graph and re-apply the selection as it stands.
    fn replace_full(&mut self, graph: Graph) -> Result<()> {
        self.full = graph;
        let stale = self
            .selection
            .iter()
            .filter(|id| !self.full.contains(id.as_str()))
            .count();
        if stale > 0 {
            tracing::debug!(stale, "selected ids missing from snapshot");
        }
        self.apply_selection()?;
        Ok(())
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Show the selected nodes and their one-hop neighborhoods.
    ///
    /// Ids absent from the full graph contribute nothing, so a selection of
    /// only unknown ids shows an empty graph. Always reheats.
    pub fn set_selection<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<()> {
        let mut selection: Vec<NodeId> = ids
            .iter()
            .map(|id| NodeId::from(id.as_ref()))
            .collect();
        selection.sort();
        selection.dedup();
        self.selection = selection;

        tracing::debug!(selected = self.selection.len(), "selection changed");
        if !self.apply_selection()? {
            self.engine.reheat();
        }
        Ok(())
    }

    /// Show the whole graph again.
    pub fn reset_selection(&mut self) -> Result<()> {
        self.set_selection::<&str>(&[])
    }

    /// Currently selected ids, sorted.
    pub fn selection(&self) -> &[NodeId] {
        &self.selection
    }

    /// Filter the full graph and hand it to the engine. Returns whether the
    /// engine reheated.
    fn apply_selection(&mut self) -> Result<bool> {
        let working = self.filter.filter(&self.full, &self.selection)?;
        let reheated = self.engine.set_graph(working)?;
        self.engine.mark_selected(&self.selection);
        Ok(reheated)
    }

    // =========================================================================
    // Pointer Events
    // =========================================================================

    /// Fix a node at `(x, y)` and reheat.
    pub fn pin(&mut self, id: &str, x: f64, y: f64) -> Result<()> {
        self.engine.pin(id, x, y)
    }

    /// Move a held node.
    pub fn drag(&mut self, id: &str, x: f64, y: f64) -> Result<()> {
        self.engine.drag(id, x, y)
    }

    /// Let a held node go.
    pub fn release(&mut self, id: &str) -> Result<bool> {
        self.engine.release(id)
    }

    // =========================================================================
    // Stepping & Access
    // =========================================================================

    /// Advance the layout by one step.
    pub fn step(&mut self) -> Phase {
        self.engine.step()
    }

    /// The full graph from the latest snapshot.
    pub fn full_graph(&self) -> &Graph {
        &self.full
    }

    /// The layout engine over the working graph.
    pub fn engine(&self) -> &LayoutEngine {
        &self.engine
    }

    /// Mutable engine access, for hit testing and stepping helpers.
    pub fn engine_mut(&mut self) -> &mut LayoutEngine {
        &mut self.engine
    }

    /// Events queued since the last drain, oldest first.
    pub fn pending_events(&self) -> &[LayoutEvent] {
        self.engine.pending_events()
    }

    /// Take all queued events.
    pub fn drain_events(&mut self) -> Vec<LayoutEvent> {
        self.engine.drain_events()
    }

    /// Diagnostics from the latest snapshot still in the queue, in record
    /// order.
    pub fn pending_diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.engine.pending_events().iter().filter_map(|event| match event {
            LayoutEvent::Diagnostic(diagnostic) => Some(diagnostic),
            _ => None,
        })
    }
}
