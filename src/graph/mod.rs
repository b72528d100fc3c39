//! Graph data structures.
//!
//! The binding graph keeps string identity (`NodeId`) backed by a tagged
//! identity key (`NodeKey`), so identical subjects referenced by several
//! bindings collapse to one node without relying on string concatenation.

mod edge;
mod model;
mod node;
mod record;

pub use edge::{Edge, EdgeKind};
pub use model::{Graph, GraphData, NodeData};
pub use node::{Node, NodeId, NodeKey, NodeState, Point};
pub use record::{BindingRecord, RoleRef, Subject};

pub(crate) use record::present;
