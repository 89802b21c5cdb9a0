// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the flow runtime.

use crate::node::{NodeId, SignalMode};

/// Errors raised by fallible flow operations.
///
/// Signal propagation never returns these: problems during traversal are
/// logged and the signal is dropped.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// Node does not allow the requested signal mode
    #[error("Signal mode {mode:?} is not supported by node {node_id}")]
    UnsupportedSignalMode {
        /// Node that rejected the mode
        node_id: NodeId,
        /// Requested mode
        mode: SignalMode,
    },

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// No factory registered for a node class
    #[error("Unknown node class: {0}")]
    UnknownNodeClass(String),

    /// Save data written by a newer format
    #[error("Save data version {found} is newer than supported version {supported}")]
    UnsupportedSaveVersion {
        /// Version found in the buffer
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },

    /// File written by a newer format
    #[error("{kind} version {found} is newer than supported version {supported}")]
    UnsupportedFileVersion {
        /// File kind ("Settings", "Flow asset")
        kind: &'static str,
        /// Version found in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },

    /// Node-specific state could not be restored
    #[error("Invalid state for node {node_id}: {reason}")]
    InvalidNodeState {
        /// Node that rejected its state
        node_id: NodeId,
        /// What was wrong
        reason: String,
    },

    /// Authored property value could not be applied
    #[error("Invalid value {value:?} for property {name}")]
    InvalidProperty {
        /// Property name
        name: String,
        /// Rejected value
        value: String,
    },

    /// Binary (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// RON serialization error
    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    /// RON parse error
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid connection in authored content
    #[error(transparent)]
    Connection(#[from] crate::graph::ConnectionError),
}

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
