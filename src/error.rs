//! Crate-wide error type.
//!
//! Only conditions that indicate a caller bug or a broken invariant are
//! returned as [`Error`]. Malformed binding records are not errors: the
//! builder skips them and reports a [`Diagnostic`](crate::builder::Diagnostic).

/// Errors raised by graph construction, layout and interaction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// An edge names a node id that is not part of the graph.
    #[error("edge {source_id} -> {target_id} references missing node `{missing}`")]
    MissingEndpoint {
        source_id: String,
        target_id: String,
        missing: String,
    },

    /// Two different entities render to the same node id.
    #[error("node id `{id}` is already owned by a different entity")]
    IdCollision { id: String },

    /// An interaction referenced a node outside the working graph.
    #[error("unknown node `{0}`")]
    UnknownNode(String),

    /// A coordinate handed to the engine was NaN or infinite.
    #[error("coordinate ({x}, {y}) is not finite")]
    NonFiniteCoordinate { x: f64, y: f64 },

    /// A layout parameter is out of range.
    #[error("invalid layout config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
