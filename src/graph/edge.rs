//! Edge type and related structures.
//!
//! Edges are directed binding → subject and binding → roleRef relations.
//! The layout treats them as undirected springs.

use serde::{Deserialize, Serialize};

use super::node::NodeId;

/// What relation an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    /// Binding grants permissions to a subject.
    Subject,
    /// Binding refers to the role it grants.
    RoleRef,
    /// Link taken verbatim from a prebuilt graph snapshot.
    #[default]
    Link,
}

/// A directed edge between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(rename = "source")]
    pub source_id: NodeId,
    #[serde(rename = "target")]
    pub target_id: NodeId,
    #[serde(default)]
    pub kind: EdgeKind,
}

impl Edge {
    /// Create an edge.
    pub fn new(source_id: NodeId, target_id: NodeId, kind: EdgeKind) -> Self {
        Self {
            source_id,
            target_id,
            kind,
        }
    }

    /// True when either endpoint is `id`.
    #[inline]
    pub fn touches(&self, id: &str) -> bool {
        self.source_id.as_str() == id || self.target_id.as_str() == id
    }
}
