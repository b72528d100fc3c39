//! Node type and related structures.
//!
//! Nodes are the vertices of the binding graph. Each node has:
//! - A tagged identity key (binding, subject/role entity, or plain id)
//! - A rendered string id, unique within a graph
//! - Position (x, y) and velocity (vx, vy) in graph space
//! - An optional fixed position while pinned or dragged

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a logical entity in the binding graph.
///
/// Identity is decided by the key, never by its rendered string, so a binding
/// named `User-alice` and the subject `User`/`alice` stay distinct keys even
/// though they render to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKey {
    /// A RoleBinding or ClusterRoleBinding, identified by its name.
    Binding { name: String },
    /// A subject or role reference, identified by `(kind, name)`.
    Entity { kind: String, name: String },
    /// A node from a prebuilt graph snapshot, identified by its id verbatim.
    Plain { id: String },
}

impl NodeKey {
    /// Create a binding key.
    pub fn binding(name: impl Into<String>) -> Self {
        Self::Binding { name: name.into() }
    }

    /// Create a subject/role entity key.
    pub fn entity(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Entity {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Render the string id used by renderers and selections.
    pub fn id(&self) -> NodeId {
        match self {
            Self::Binding { name } => NodeId(name.clone()),
            Self::Entity { kind, name } => NodeId(format!("{kind}-{name}")),
            Self::Plain { id } => NodeId(id.clone()),
        }
    }
}

/// Rendered node identifier.
///
/// Stable across rebuilds for the same logical entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a NodeId from anything string-like.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    #[inline]
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for NodeId {
    #[inline]
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for NodeId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A 2D point or vector in graph space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True when both components are finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A vertex of the binding graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub key: NodeKey,
    /// Binding kind for binding nodes; `None` for subjects and role refs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub label: String,
    #[serde(default)]
    pub position: Point,
    #[serde(default)]
    pub velocity: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_position: Option<Point>,
}

impl Node {
    /// Create a node at the origin with its id rendered from `key`.
    pub fn new(key: NodeKey, kind: Option<String>, label: impl Into<String>) -> Self {
        Self {
            id: key.id(),
            key,
            kind,
            label: label.into(),
            position: Point::default(),
            velocity: Point::default(),
            fixed_position: None,
        }
    }

    /// True for RoleBinding / ClusterRoleBinding nodes.
    pub fn is_binding(&self) -> bool {
        matches!(self.key, NodeKey::Binding { .. })
    }
}

/// Node state flags packed into a single byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeState {
    flags: u8,
}

impl NodeState {
    const PINNED: u8 = 0b0000_0001;
    const SELECTED: u8 = 0b0000_0010;

    /// Create a new default node state.
    #[inline]
    pub fn new() -> Self {
        Self { flags: 0 }
    }

    /// Check if the node is pinned (position driven by interaction).
    #[inline]
    pub fn is_pinned(self) -> bool {
        self.flags & Self::PINNED != 0
    }

    /// Set the pinned state.
    #[inline]
    pub fn set_pinned(&mut self, pinned: bool) {
        if pinned {
            self.flags |= Self::PINNED;
        } else {
            self.flags &= !Self::PINNED;
        }
    }

    /// Check if the node was explicitly selected (not pulled in as a neighbor).
    #[inline]
    pub fn is_selected(self) -> bool {
        self.flags & Self::SELECTED != 0
    }

    /// Set the selected state.
    #[inline]
    pub fn set_selected(&mut self, selected: bool) {
        if selected {
            self.flags |= Self::SELECTED;
        } else {
            self.flags &= !Self::SELECTED;
        }
    }
}
