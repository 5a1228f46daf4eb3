//! Error types for the model

use crate::node::NodeId;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Parent not found: {0}")]
    ParentNotFound(NodeId),

    #[error("Would create cycle")]
    CycleDetected,

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Attribute '{key}' is not allowed on '{name}'")]
    AttributeNotAllowed { name: String, key: String },

    #[error("Offset {offset} is out of bounds for {node}")]
    OffsetOutOfBounds { node: NodeId, offset: usize },

    #[error("Node {0} is not a text run")]
    NotText(NodeId),

    #[error("Cannot remove the root node")]
    RootRemoval,

    /// Mutation attempted outside `Model::change`. Observers rely on
    /// transaction atomicity, so this is never recovered from.
    #[error("Model mutated outside of a change transaction")]
    TransactionViolation,
}
