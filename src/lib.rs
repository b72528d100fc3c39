//! RBAC Graph - WASM Module
//!
//! Graph construction and force-directed layout for Kubernetes RBAC
//! bindings. Compiled to WebAssembly, the crate exposes a JavaScript-friendly
//! API via wasm-bindgen; the same core is usable natively as an rlib.
//!
//! # Architecture
//!
//! - `graph`: Nodes, edges and binding records with tagged identity
//! - `builder`: Binding records → deduplicated graph, with diagnostics
//! - `filter`: Selection → one-hop neighborhood subgraph
//! - `spatial`: Barnes–Hut quadtree for repulsion, R-tree for hit testing
//! - `layout`: Force-directed simulation over SoA position buffers
//! - `interaction`: Selection and pin/drag/release routing
//! - `event`: Diagnostic, reheat and settle notifications

use js_sys::Float64Array;
use wasm_bindgen::prelude::*;

pub mod builder;
pub mod error;
pub mod event;
pub mod filter;
pub mod graph;
pub mod interaction;
pub mod layout;
pub mod spatial;

pub use builder::{BuildReport, Diagnostic, GraphBuilder, MalformedRecord};
pub use error::{Error, Result};
pub use event::LayoutEvent;
pub use filter::SubgraphFilter;
pub use graph::{BindingRecord, Edge, EdgeKind, Graph, GraphData, Node, NodeId, NodeKey, Point};
pub use interaction::InteractionController;
pub use layout::{LayoutConfig, LayoutEngine, Phase};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Forward a message to the browser console.
fn console_warn(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::warn_1(&JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    let _ = message;
}

fn to_strings<'a>(ids: impl IntoIterator<Item = &'a NodeId>) -> Vec<String> {
    ids.into_iter().map(|id| id.to_string()).collect()
}

/// Main entry point for the binding graph.
///
/// This struct wraps the internal InteractionController and provides the
/// public API exposed to JavaScript.
#[wasm_bindgen]
pub struct RbacGraphWasm {
    controller: InteractionController,
}

#[wasm_bindgen]
impl RbacGraphWasm {
    /// Create an empty graph laid out on a canvas of the given size.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> std::result::Result<RbacGraphWasm, JsError> {
        Ok(Self {
            controller: InteractionController::new(LayoutConfig::with_canvas(width, height))?,
        })
    }

    /// Create an empty graph from a partial layout configuration object.
    ///
    /// Missing fields keep their defaults.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(config: JsValue) -> std::result::Result<RbacGraphWasm, JsError> {
        let config: LayoutConfig = if config.is_undefined() || config.is_null() {
            LayoutConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        Ok(Self {
            controller: InteractionController::new(config)?,
        })
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Replace the graph with one built from an array of binding records.
    ///
    /// Returns the number of skipped elements; each one is also queued as a
    /// diagnostic event and logged to the console.
    #[wasm_bindgen(js_name = loadBindings)]
    pub fn load_bindings(&mut self, records: JsValue) -> std::result::Result<u32, JsError> {
        let records: Vec<BindingRecord> = serde_wasm_bindgen::from_value(records)?;
        let skipped = self.controller.load(&records)?;
        for diagnostic in self.controller.pending_diagnostics() {
            console_warn(&diagnostic.to_string());
        }
        Ok(skipped as u32)
    }

    /// Replace the graph with a prebuilt `{ nodes, links }` snapshot.
    #[wasm_bindgen(js_name = loadGraph)]
    pub fn load_graph(&mut self, data: JsValue) -> std::result::Result<(), JsError> {
        let data: GraphData = serde_wasm_bindgen::from_value(data)?;
        self.controller.load_graph(data)?;
        Ok(())
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Show the selected nodes and their neighbors. An empty array shows all.
    #[wasm_bindgen(js_name = setSelection)]
    pub fn set_selection(&mut self, ids: Vec<String>) -> std::result::Result<(), JsError> {
        self.controller.set_selection(&ids)?;
        Ok(())
    }

    /// Show the whole graph.
    #[wasm_bindgen(js_name = resetSelection)]
    pub fn reset_selection(&mut self) -> std::result::Result<(), JsError> {
        self.controller.reset_selection()?;
        Ok(())
    }

    /// Currently selected ids.
    pub fn selection(&self) -> Vec<String> {
        to_strings(self.controller.selection())
    }

    /// Ids of the bindings that can be selected.
    #[wasm_bindgen(js_name = bindingIds)]
    pub fn binding_ids(&self) -> Vec<String> {
        to_strings(&self.controller.full_graph().binding_ids())
    }

    // =========================================================================
    // Pointer Events
    // =========================================================================

    /// Pin a node at a position (drag start).
    pub fn pin(&mut self, id: &str, x: f64, y: f64) -> std::result::Result<(), JsError> {
        self.controller.pin(id, x, y)?;
        Ok(())
    }

    /// Move a pinned node (drag move).
    pub fn drag(&mut self, id: &str, x: f64, y: f64) -> std::result::Result<(), JsError> {
        self.controller.drag(id, x, y)?;
        Ok(())
    }

    /// Release a pinned node (drag end).
    ///
    /// Returns false if the node was not pinned.
    pub fn release(&mut self, id: &str) -> std::result::Result<bool, JsError> {
        Ok(self.controller.release(id)?)
    }

    /// Check if a node is pinned.
    #[wasm_bindgen(js_name = isPinned)]
    pub fn is_pinned(&self, id: &str) -> bool {
        self.controller.engine().is_pinned(id)
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Run up to `steps` simulation steps. Returns true once settled.
    pub fn tick(&mut self, steps: u32) -> bool {
        self.controller.engine_mut().run(steps as usize);
        self.controller.engine().is_settled()
    }

    /// Re-energize the simulation.
    pub fn reheat(&mut self) {
        self.controller.engine_mut().reheat();
    }

    /// Current alpha.
    pub fn alpha(&self) -> f64 {
        self.controller.engine().alpha()
    }

    /// Check if the simulation has settled.
    #[wasm_bindgen(js_name = isSettled)]
    pub fn is_settled(&self) -> bool {
        self.controller.engine().is_settled()
    }

    /// Take queued events as an array of `{ type, ... }` objects.
    #[wasm_bindgen(js_name = drainEvents)]
    pub fn drain_events(&mut self) -> std::result::Result<JsValue, JsError> {
        let events = self.controller.drain_events();
        Ok(serde_wasm_bindgen::to_value(&events)?)
    }

    // =========================================================================
    // Position Buffer Access (Zero-Copy)
    // =========================================================================

    /// Get a zero-copy view of X positions, in `nodeIds` order.
    ///
    /// # Safety
    ///
    /// The returned view is invalidated if any Rust allocation occurs.
    /// Use immediately, do not store.
    #[wasm_bindgen(js_name = getPositionsXView)]
    pub fn get_positions_x_view(&self) -> Float64Array {
        unsafe { Float64Array::view(self.controller.engine().positions_x()) }
    }

    /// Get a zero-copy view of Y positions, in `nodeIds` order.
    ///
    /// # Safety
    ///
    /// The returned view is invalidated if any Rust allocation occurs.
    /// Use immediately, do not store.
    #[wasm_bindgen(js_name = getPositionsYView)]
    pub fn get_positions_y_view(&self) -> Float64Array {
        unsafe { Float64Array::view(self.controller.engine().positions_y()) }
    }

    /// Get a pointer to the X positions buffer.
    ///
    /// Used for creating views after WASM memory growth.
    #[wasm_bindgen(js_name = positionsXPtr)]
    pub fn positions_x_ptr(&self) -> *const f64 {
        self.controller.engine().positions_x().as_ptr()
    }

    /// Get a pointer to the Y positions buffer.
    #[wasm_bindgen(js_name = positionsYPtr)]
    pub fn positions_y_ptr(&self) -> *const f64 {
        self.controller.engine().positions_y().as_ptr()
    }

    /// Get the length of the positions buffer.
    #[wasm_bindgen(js_name = positionsLen)]
    pub fn positions_len(&self) -> usize {
        self.controller.engine().positions_x().len()
    }

    /// Ids of the working graph, in buffer order.
    #[wasm_bindgen(js_name = nodeIds)]
    pub fn node_ids(&self) -> Vec<String> {
        to_strings(self.controller.engine().node_ids())
    }

    /// The working graph with live positions, as `{ nodes, links }`.
    pub fn snapshot(&self) -> std::result::Result<JsValue, JsError> {
        Ok(serde_wasm_bindgen::to_value(&self.controller.engine().snapshot())?)
    }

    /// Get the number of nodes in the working graph.
    #[wasm_bindgen(js_name = nodeCount)]
    pub fn node_count(&self) -> usize {
        self.controller.engine().node_count()
    }

    /// Get the number of edges in the working graph.
    #[wasm_bindgen(js_name = edgeCount)]
    pub fn edge_count(&self) -> usize {
        self.controller.engine().graph().edge_count()
    }

    /// Ids adjacent to a node, for hover highlighting.
    pub fn neighbors(&self, id: &str) -> Vec<String> {
        to_strings(&self.controller.engine().neighbors(id))
    }

    // =========================================================================
    // Spatial Queries
    // =========================================================================

    /// Find the nearest node within a maximum distance.
    #[wasm_bindgen(js_name = findNodeAt)]
    pub fn find_node_at(&mut self, x: f64, y: f64, max_distance: f64) -> Option<String> {
        self.controller
            .engine_mut()
            .node_at(x, y, max_distance)
            .map(|id| id.to_string())
    }

    /// Find all nodes within a rectangular region.
    #[wasm_bindgen(js_name = findNodesInRect)]
    pub fn find_nodes_in_rect(
        &mut self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    ) -> Vec<String> {
        to_strings(
            &self
                .controller
                .engine_mut()
                .nodes_in_rect(min_x, min_y, max_x, max_y),
        )
    }

    /// Get the bounding box of all nodes.
    ///
    /// Returns [min_x, min_y, max_x, max_y], or None if graph is empty.
    #[wasm_bindgen(js_name = getBounds)]
    pub fn get_bounds(&self) -> Option<Vec<f64>> {
        self.controller
            .engine()
            .bounds()
            .map(|(min_x, min_y, max_x, max_y)| vec![min_x, min_y, max_x, max_y])
    }
}
