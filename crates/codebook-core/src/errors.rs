//! Error types for codebook-core.
//!
//! Every failure the core can report is a variant of [`CodebookError`]. The
//! variants fall into three classes (see [`ErrorClass`]):
//! - structural errors reject a tree mutation as a whole; the caller must roll
//!   back its transaction and never try to auto-correct
//! - data consistency errors mean the caller handed in an incoherent snapshot
//! - invalid arguments cover malformed input and configuration
//!
//! Messages always name the offending node or phase id.

use thiserror::Error;

use crate::model::{NodeId, NodeType};

/// Result alias used across the crate.
pub type CodebookResult<T> = Result<T, CodebookError>;

/// Coarse classification of a [`CodebookError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Structural,
    DataConsistency,
    InvalidArgument,
}

#[derive(Debug, Error)]
pub enum CodebookError {
    #[error("cycle detected: node {node_id} is its own ancestor")]
    Cycle { node_id: NodeId },

    #[error("{child} cannot be placed under {}", parent_label(.parent))]
    InvalidParent {
        node_id: NodeId,
        child: NodeType,
        parent: Option<NodeType>,
    },

    #[error("duplicate name {name:?} among children of {}", parent_id_label(.parent_id))]
    DuplicateName {
        name: String,
        parent_id: Option<NodeId>,
    },

    #[error("duplicate node id: {0}")]
    DuplicateId(NodeId),

    #[error("cannot delete node {0}: it has children (delete recursively instead)")]
    HasChildren(NodeId),

    #[error("node {node_id} exceeds the maximum tree depth of {max_depth}")]
    DepthLimit { node_id: NodeId, max_depth: usize },

    #[error("codebook exceeds the maximum of {max_nodes} nodes")]
    NodeLimit { max_nodes: usize },

    #[error("navigation rejected: {0}")]
    NavigationRejected(String),

    #[error("node {node_id} references missing parent {parent_id}")]
    DanglingParent { node_id: NodeId, parent_id: NodeId },

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("no unit progress for phase {0}")]
    MissingProgress(NodeId),

    #[error("variable node {0} does not belong to any phase")]
    OrphanVariable(NodeId),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

fn parent_label(parent: &Option<NodeType>) -> String {
    match parent {
        Some(t) => t.to_string(),
        None => "the root".to_string(),
    }
}

fn parent_id_label(parent_id: &Option<NodeId>) -> String {
    match parent_id {
        Some(id) => format!("node {id}"),
        None => "the root".to_string(),
    }
}

impl CodebookError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn navigation(msg: impl Into<String>) -> Self {
        Self::NavigationRejected(msg.into())
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Cycle { .. }
            | Self::InvalidParent { .. }
            | Self::DuplicateName { .. }
            | Self::DuplicateId(_)
            | Self::HasChildren(_)
            | Self::DepthLimit { .. }
            | Self::NodeLimit { .. }
            | Self::NavigationRejected(_) => ErrorClass::Structural,
            Self::DanglingParent { .. }
            | Self::NodeNotFound(_)
            | Self::MissingProgress(_)
            | Self::OrphanVariable(_) => ErrorClass::DataConsistency,
            Self::InvalidArgument(_) | Self::Serialization(_) => ErrorClass::InvalidArgument,
        }
    }

    pub fn is_structural(&self) -> bool {
        self.class() == ErrorClass::Structural
    }
}

impl From<serde_json::Error> for CodebookError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_node() {
        let e = CodebookError::InvalidParent {
            node_id: 7,
            child: NodeType::Question,
            parent: None,
        };
        assert_eq!(e.to_string(), "Question cannot be placed under the root");
        assert!(e.is_structural());

        let e = CodebookError::MissingProgress(3);
        assert!(e.to_string().contains("phase 3"));
        assert_eq!(e.class(), ErrorClass::DataConsistency);
    }
}
