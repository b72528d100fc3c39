//! Selection → one-hop neighborhood subgraph.
//!
//! An empty selection means "show everything". Otherwise the result is the
//! union, over every selected id present in the graph, of that node, every
//! edge touching it, and both endpoints of those edges. Unknown ids are
//! ignored: a selection may outlive the snapshot it was made against.

use std::collections::HashSet;

use crate::error::Result;
use crate::graph::{Graph, Node};

/// Derives connectivity-preserving subgraphs from a selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubgraphFilter;

impl SubgraphFilter {
    /// Create a new filter.
    pub fn new() -> Self {
        Self
    }

    /// Compute the selected subgraph.
    ///
    /// Each edge of `graph` appears at most once in the output, and each node
    /// appears at most once.
    pub fn filter<S: AsRef<str>>(&self, graph: &Graph, selected: &[S]) -> Result<Graph> {
        if selected.is_empty() {
            return Ok(graph.clone());
        }

        let wanted: HashSet<&str> = selected
            .iter()
            .map(AsRef::as_ref)
            .filter(|id| graph.contains(id))
            .collect();

        let mut included: HashSet<&str> = wanted.clone();
        let mut edge_indices = Vec::new();
        for (index, edge) in graph.edges().iter().enumerate() {
            if wanted.contains(edge.source_id.as_str())
                || wanted.contains(edge.target_id.as_str())
            {
                edge_indices.push(index);
                included.insert(edge.source_id.as_str());
                included.insert(edge.target_id.as_str());
            }
        }

        let mut subgraph = Graph::with_capacity(included.len(), edge_indices.len());
        let mut nodes: Vec<&Node> = graph
            .nodes()
            .filter(|node| included.contains(node.id.as_str()))
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        for node in nodes {
            subgraph.insert_node(node.clone())?;
        }
        for index in edge_indices {
            subgraph.add_edge(graph.edges()[index].clone())?;
        }

        tracing::debug!(
            selected = selected.len(),
            matched = wanted.len(),
            nodes = subgraph.node_count(),
            edges = subgraph.edge_count(),
            "filtered selection subgraph"
        );
        Ok(subgraph)
    }
}
