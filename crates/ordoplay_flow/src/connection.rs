// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection table owned by the source node of each edge.
//!
//! Every output pin maps to at most one target (node, input pin). The table
//! is authored content: it travels with the graph asset and is never written
//! into save data, so rewiring a graph does not invalidate existing saves.

use crate::node::NodeId;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Target end of a connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectedPin {
    /// Target node ID
    pub node_id: NodeId,
    /// Target input pin name
    pub pin_name: String,
}

impl ConnectedPin {
    /// Create a new connection target
    pub fn new(node_id: NodeId, pin_name: impl Into<String>) -> Self {
        Self {
            node_id,
            pin_name: pin_name.into(),
        }
    }
}

/// Output pin name to connection target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Connections {
    pins: IndexMap<String, ConnectedPin>,
}

impl Connections {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire an output pin, returning the target it replaced
    pub fn insert(
        &mut self,
        output_pin: impl Into<String>,
        target: ConnectedPin,
    ) -> Option<ConnectedPin> {
        self.pins.insert(output_pin.into(), target)
    }

    /// Unwire an output pin
    pub fn remove(&mut self, output_pin: &str) -> Option<ConnectedPin> {
        self.pins.shift_remove(output_pin)
    }

    /// Target of an output pin
    pub fn get(&self, output_pin: &str) -> Option<&ConnectedPin> {
        self.pins.get(output_pin)
    }

    /// Whether an output pin is wired
    pub fn contains(&self, output_pin: &str) -> bool {
        self.pins.contains_key(output_pin)
    }

    /// All (output pin, target) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConnectedPin)> {
        self.pins.iter().map(|(pin, target)| (pin.as_str(), target))
    }

    /// Number of wired output pins
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// Whether no output pin is wired
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Whether any entry targets the given node input pin
    pub fn targets(&self, node_id: NodeId, input_pin: &str) -> bool {
        self.pins
            .values()
            .any(|target| target.node_id == node_id && target.pin_name == input_pin)
    }

    /// First output pin wired to the given node
    pub fn pin_connected_to_node(&self, node_id: NodeId) -> Option<&str> {
        self.pins
            .iter()
            .find(|(_, target)| target.node_id == node_id)
            .map(|(pin, _)| pin.as_str())
    }

    /// Distinct target nodes, in wiring order
    pub fn connected_node_ids(&self) -> IndexSet<NodeId> {
        self.pins.values().map(|target| target.node_id).collect()
    }

    /// Drop every entry targeting the given node
    pub fn remove_node(&mut self, node_id: NodeId) {
        self.pins.retain(|_, target| target.node_id != node_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_target_per_pin() {
        let first = NodeId::new();
        let second = NodeId::new();
        let mut connections = Connections::new();

        assert!(connections.insert("Out", ConnectedPin::new(first, "In")).is_none());
        let replaced = connections.insert("Out", ConnectedPin::new(second, "In"));
        assert_eq!(replaced.map(|t| t.node_id), Some(first));
        assert_eq!(connections.len(), 1);
        assert_eq!(connections.get("Out").map(|t| t.node_id), Some(second));
    }

    #[test]
    fn test_lookups() {
        let target = NodeId::new();
        let other = NodeId::new();
        let mut connections = Connections::new();
        connections.insert("A", ConnectedPin::new(target, "In"));
        connections.insert("B", ConnectedPin::new(target, "Reset"));
        connections.insert("C", ConnectedPin::new(other, "In"));

        assert!(connections.targets(target, "Reset"));
        assert!(!connections.targets(other, "Reset"));
        assert_eq!(connections.pin_connected_to_node(other), Some("C"));
        assert_eq!(connections.connected_node_ids().len(), 2);

        connections.remove_node(target);
        assert_eq!(connections.len(), 1);
        assert!(!connections.contains("A"));
    }
}
