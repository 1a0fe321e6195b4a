//! Error types for structural misuse of the live tree.
//!
//! Reconciliation itself is policy-driven and does not fail: missing bindings,
//! destroyed instances and tag changes are handled silently or by
//! replacement. These errors only surface from the mount surface when a
//! caller hands in a handle that cannot be used.

use thiserror::Error;

use crate::types::{InstanceId, NodeId};

/// Engine error type
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Handle refers to a freed node
    #[error("stale node handle: {0}")]
    StaleNode(NodeId),

    /// Operation requires an element but the node is text
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    /// Reference node is not a child of the given parent
    #[error("node {child} is not a child of {parent}")]
    NotAChild {
        /// Expected parent
        parent: NodeId,
        /// Offending child
        child: NodeId,
    },

    /// Node has no parent to be replaced within
    #[error("node {0} is detached")]
    Detached(NodeId),

    /// Inserting a node into its own subtree
    #[error("cannot insert {0} into its own subtree")]
    CycleDetected(NodeId),

    /// The permanent document root cannot be removed or replaced
    #[error("node {0} is the document root")]
    RootNode(NodeId),

    /// Instance id has no runtime record
    #[error("unknown component instance: {0}")]
    UnknownInstance(InstanceId),

    /// Raw markup could not be parsed
    #[error("markup parse error: {0}")]
    Markup(String),
}

/// Specialized Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a markup error
    pub fn markup(msg: impl Into<String>) -> Self {
        Self::Markup(msg.into())
    }
}
