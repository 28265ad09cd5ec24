//! Error types for HTML document operations

use crate::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Invalid position: node {node_id}, offset {offset}")]
    InvalidPosition { node_id: NodeId, offset: usize },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Tree structure error: {0}")]
    TreeStructure(String),

    #[error("Markup parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, DomError>;
