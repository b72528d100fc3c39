//! The binding graph: deduplicated nodes plus an ordered edge list.
//!
//! Invariant: every edge's endpoints exist in `nodes`. All mutation goes
//! through [`Graph::insert_node`] and [`Graph::add_edge`], which enforce it.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::edge::{Edge, EdgeKind};
use super::node::{Node, NodeId, NodeKey};
use crate::error::{Error, Result};

/// Node kinds that can be picked as a selection root.
const BINDING_KINDS: [&str; 2] = ["RoleBinding", "ClusterRoleBinding"];

/// A node/edge graph with string identity.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
    edges: Vec<Edge>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph with pre-allocated capacity.
    pub fn with_capacity(node_capacity: usize, edge_capacity: usize) -> Self {
        Self {
            nodes: HashMap::with_capacity(node_capacity),
            edges: Vec::with_capacity(edge_capacity),
        }
    }

    /// Build a graph from a prebuilt nodes/links snapshot.
    ///
    /// Links must reference listed node ids; a dangling link is an invariant
    /// violation, not something to skip.
    pub fn from_data(data: GraphData) -> Result<Self> {
        let mut graph = Self::with_capacity(data.nodes.len(), data.links.len());
        for node in data.nodes {
            let key = NodeKey::Plain { id: node.id.clone() };
            let label = node.label.unwrap_or_else(|| node.id.clone());
            graph.insert_node(Node::new(key, node.kind, label))?;
        }
        for link in data.links {
            graph.add_edge(link)?;
        }
        Ok(graph)
    }

    // =========================================================================
    // Node Operations
    // =========================================================================

    /// Insert a node, or reuse the existing node with the same key.
    ///
    /// Returns `true` when the node was newly inserted. Fails when its id is
    /// already owned by a node with a different key.
    pub fn insert_node(&mut self, node: Node) -> Result<bool> {
        match self.nodes.get(&node.id) {
            Some(existing) if existing.key == node.key => Ok(false),
            Some(_) => Err(Error::IdCollision {
                id: node.id.to_string(),
            }),
            None => {
                self.nodes.insert(node.id.clone(), node);
                Ok(true)
            }
        }
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Check whether a node id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Iterate nodes in unspecified order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Ids of binding nodes that can seed a selection, sorted.
    pub fn binding_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|node| {
                node.kind
                    .as_deref()
                    .is_some_and(|kind| BINDING_KINDS.contains(&kind))
            })
            .map(|node| node.id.clone())
            .collect();
        ids.sort();
        ids
    }

    // =========================================================================
    // Edge Operations
    // =========================================================================

    /// Append an edge. Both endpoints must already exist.
    pub fn add_edge(&mut self, edge: Edge) -> Result<()> {
        for endpoint in [&edge.source_id, &edge.target_id] {
            if !self.nodes.contains_key(endpoint) {
                return Err(Error::MissingEndpoint {
                    source_id: edge.source_id.to_string(),
                    target_id: edge.target_id.to_string(),
                    missing: endpoint.to_string(),
                });
            }
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Append an edge between two ids.
    pub fn connect(&mut self, source: &NodeId, target: &NodeId, kind: EdgeKind) -> Result<()> {
        self.add_edge(Edge::new(source.clone(), target.clone(), kind))
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Get the number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    // =========================================================================
    // Utilities
    // =========================================================================

    /// True when the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Re-check the endpoint invariant over every edge.
    pub fn validate(&self) -> Result<()> {
        for edge in &self.edges {
            for endpoint in [&edge.source_id, &edge.target_id] {
                if !self.nodes.contains_key(endpoint) {
                    return Err(Error::MissingEndpoint {
                        source_id: edge.source_id.to_string(),
                        target_id: edge.target_id.to_string(),
                        missing: endpoint.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Compare node id sets and edge multisets, ignoring order and positions.
    pub fn same_elements(&self, other: &Graph) -> bool {
        if self.nodes.len() != other.nodes.len() || self.edges.len() != other.edges.len() {
            return false;
        }
        let ids: HashSet<&NodeId> = self.nodes.keys().collect();
        if !other.nodes.keys().all(|id| ids.contains(id)) {
            return false;
        }

        let mut counts: HashMap<&Edge, i64> = HashMap::new();
        for edge in &self.edges {
            *counts.entry(edge).or_default() += 1;
        }
        for edge in &other.edges {
            *counts.entry(edge).or_default() -= 1;
        }
        counts.values().all(|&count| count == 0)
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }
}

impl Serialize for Graph {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct View<'a> {
            nodes: Vec<&'a Node>,
            links: &'a [Edge],
        }

        let mut nodes: Vec<&Node> = self.nodes.values().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        View {
            nodes,
            links: &self.edges,
        }
        .serialize(serializer)
    }
}

/// A prebuilt `{ nodes, links }` snapshot, as produced by a what-if analysis.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub nodes: Vec<NodeData>,
    #[serde(default)]
    pub links: Vec<Edge>,
}

/// A node entry of [`GraphData`].
#[derive(Debug, Clone, Deserialize)]
pub struct NodeData {
    pub id: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(name: &str, kind: &str) -> Node {
        Node::new(NodeKey::binding(name), Some(kind.into()), name)
    }

    fn entity(kind: &str, name: &str) -> Node {
        Node::new(NodeKey::entity(kind, name), None, format!("{kind} - {name}"))
    }

    #[test]
    fn test_insert_and_reuse() {
        let mut graph = Graph::new();
        assert_eq!(graph.insert_node(entity("User", "alice")), Ok(true));
        assert_eq!(graph.insert_node(entity("User", "alice")), Ok(false));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_insert_collision() {
        let mut graph = Graph::new();
        graph.insert_node(binding("User-alice", "RoleBinding")).unwrap();
        let err = graph.insert_node(entity("User", "alice")).unwrap_err();
        assert_eq!(
            err,
            Error::IdCollision {
                id: "User-alice".into()
            }
        );
    }

    #[test]
    fn test_add_edge_requires_endpoints() {
        let mut graph = Graph::new();
        graph.insert_node(binding("b1", "RoleBinding")).unwrap();

        let err = graph
            .connect(&"b1".into(), &"User-bob".into(), EdgeKind::Subject)
            .unwrap_err();
        assert!(matches!(err, Error::MissingEndpoint { ref missing, .. } if missing == "User-bob"));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_binding_ids() {
        let mut graph = Graph::new();
        graph.insert_node(binding("z", "ClusterRoleBinding")).unwrap();
        graph.insert_node(binding("a", "RoleBinding")).unwrap();
        graph.insert_node(entity("User", "alice")).unwrap();

        let ids = graph.binding_ids();
        assert_eq!(ids, vec![NodeId::from("a"), NodeId::from("z")]);
    }

    #[test]
    fn test_same_elements_ignores_order() {
        let mut a = Graph::new();
        let mut b = Graph::new();
        for graph in [&mut a, &mut b] {
            graph.insert_node(binding("b1", "RoleBinding")).unwrap();
            graph.insert_node(entity("User", "alice")).unwrap();
            graph.insert_node(entity("Role", "edit")).unwrap();
        }
        a.connect(&"b1".into(), &"User-alice".into(), EdgeKind::Subject).unwrap();
        a.connect(&"b1".into(), &"Role-edit".into(), EdgeKind::RoleRef).unwrap();
        b.connect(&"b1".into(), &"Role-edit".into(), EdgeKind::RoleRef).unwrap();
        b.connect(&"b1".into(), &"User-alice".into(), EdgeKind::Subject).unwrap();

        assert!(a.same_elements(&b));

        b.connect(&"b1".into(), &"Role-edit".into(), EdgeKind::RoleRef).unwrap();
        assert!(!a.same_elements(&b));
    }

    #[test]
    fn test_from_data() {
        let data: GraphData = serde_json::from_value(serde_json::json!({
            "nodes": [
                { "id": "ClusterRoleBinding-admins", "kind": "ClusterRoleBinding" },
                { "id": "Group-ops", "label": "Group - ops" }
            ],
            "links": [{ "source": "ClusterRoleBinding-admins", "target": "Group-ops" }]
        }))
        .unwrap();

        let graph = Graph::from_data(data).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.node("Group-ops").unwrap().label, "Group - ops");
        assert_eq!(
            graph.node("ClusterRoleBinding-admins").unwrap().label,
            "ClusterRoleBinding-admins"
        );
    }

    #[test]
    fn test_from_data_dangling_link() {
        let data: GraphData = serde_json::from_value(serde_json::json!({
            "nodes": [{ "id": "a" }],
            "links": [{ "source": "a", "target": "ghost" }]
        }))
        .unwrap();

        assert!(matches!(
            Graph::from_data(data),
            Err(Error::MissingEndpoint { .. })
        ));
    }

    #[test]
    fn test_serialize_sorted_nodes() {
        let mut graph = Graph::new();
        graph.insert_node(entity("User", "zed")).unwrap();
        graph.insert_node(binding("b1", "RoleBinding")).unwrap();
        graph.connect(&"b1".into(), &"User-zed".into(), EdgeKind::Subject).unwrap();

        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["nodes"][0]["id"], "User-zed");
        assert_eq!(json["nodes"][1]["id"], "b1");
        assert_eq!(json["links"][0]["source"], "b1");
        assert_eq!(json["links"][0]["kind"], "subject");
    }
}
