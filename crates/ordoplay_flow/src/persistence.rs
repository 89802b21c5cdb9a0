// SPDX-License-Identifier: MIT OR Apache-2.0
//! Save data for node and graph instances.
//!
//! A node writes its runtime fields into an opaque buffer keyed by its ID.
//! The buffer is a bincode archive of the shared fields (activation state and
//! time) plus the bytes produced by the node type's own `save_state`.
//! Pins, signal modes and connections are authored content and never saved.

use crate::error::{FlowError, Result};
use crate::node::{ActivationState, NodeId};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current node archive version
pub const NODE_ARCHIVE_VERSION: u32 = 1;

/// Saved state of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSaveData {
    /// Node the buffer belongs to
    pub node_id: NodeId,
    /// Opaque serialized state
    pub data: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct NodeArchive {
    pub(crate) version: u32,
    pub(crate) activation_state: ActivationState,
    pub(crate) activated_time: f64,
    pub(crate) custom: Vec<u8>,
}

impl NodeArchive {
    pub(crate) fn decode(data: &[u8]) -> Result<Self> {
        let archive: NodeArchive = bincode::deserialize(data)?;
        if archive.version > NODE_ARCHIVE_VERSION {
            return Err(FlowError::UnsupportedSaveVersion {
                found: archive.version,
                supported: NODE_ARCHIVE_VERSION,
            });
        }
        Ok(archive)
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }
}

/// Encode node-specific fields for `FlowNode::save_state`
pub fn encode_state<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

/// Decode node-specific fields in `FlowNode::load_state`
pub fn decode_state<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(data)?)
}

/// Saved state of a graph instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowSaveData {
    /// Graph the data was taken from
    pub graph_name: String,
    /// Time the save was taken
    pub saved_time: f64,
    /// Records of the nodes that were active
    pub nodes: Vec<NodeSaveData>,
}

impl FlowSaveData {
    /// Record for a node
    pub fn node(&self, node_id: NodeId) -> Option<&NodeSaveData> {
        self.nodes.iter().find(|record| record.node_id == node_id)
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> std::result::Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> std::result::Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }

    /// Save to a RON file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Load from a RON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_ron(&content)?)
    }
}

/// Byte buffers keyed by node ID
pub trait SaveStore {
    /// Store a node's buffer, replacing any previous one
    fn write(&mut self, node_id: NodeId, data: Vec<u8>);

    /// A node's buffer
    fn read(&self, node_id: NodeId) -> Option<&[u8]>;

    /// Remove a node's buffer
    fn remove(&mut self, node_id: NodeId) -> Option<Vec<u8>>;
}

/// In-memory [`SaveStore`]
#[derive(Debug, Clone, Default)]
pub struct MemorySaveStore {
    buffers: IndexMap<NodeId, Vec<u8>>,
}

impl MemorySaveStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored buffers
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Stored node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.buffers.keys().copied()
    }
}

impl SaveStore for MemorySaveStore {
    fn write(&mut self, node_id: NodeId, data: Vec<u8>) {
        self.buffers.insert(node_id, data);
    }

    fn read(&self, node_id: NodeId) -> Option<&[u8]> {
        self.buffers.get(&node_id).map(Vec::as_slice)
    }

    fn remove(&mut self, node_id: NodeId) -> Option<Vec<u8>> {
        self.buffers.shift_remove(&node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_version_check() {
        let archive = NodeArchive {
            version: NODE_ARCHIVE_VERSION + 1,
            activation_state: ActivationState::Active,
            activated_time: 2.0,
            custom: Vec::new(),
        };
        let bytes = archive.encode().unwrap();
        assert!(matches!(
            NodeArchive::decode(&bytes),
            Err(FlowError::UnsupportedSaveVersion { .. })
        ));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(NodeArchive::decode(&[1, 2]).is_err());
    }

    #[test]
    fn test_state_helpers() {
        let bytes = encode_state(&(3_u32, "goal".to_string())).unwrap();
        let (count, label): (u32, String) = decode_state(&bytes).unwrap();
        assert_eq!(count, 3);
        assert_eq!(label, "goal");
    }

    #[test]
    fn test_save_data_formats() {
        let id = NodeId::new();
        let data = FlowSaveData {
            graph_name: "Quest".to_string(),
            saved_time: 4.5,
            nodes: vec![NodeSaveData {
                node_id: id,
                data: vec![0, 1, 2],
            }],
        };

        let from_ron = FlowSaveData::from_ron(&data.to_ron().unwrap()).unwrap();
        assert_eq!(from_ron, data);
        let from_bytes = FlowSaveData::from_bytes(&data.to_bytes().unwrap()).unwrap();
        assert_eq!(from_bytes.node(id).map(|n| n.data.len()), Some(3));
    }

    #[test]
    fn test_memory_store() {
        let id = NodeId::new();
        let mut store = MemorySaveStore::new();
        store.write(id, vec![7]);
        store.write(id, vec![8, 9]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.read(id), Some(&[8, 9][..]));
        assert_eq!(store.remove(id), Some(vec![8, 9]));
        assert!(store.is_empty());
    }
}
