// SPDX-License-Identifier: MIT OR Apache-2.0
//! Authored flow assets.
//!
//! An asset is the designer-facing description of a graph: which node
//! classes it holds, how they are configured and how they are wired. It is
//! stored as RON and turned into a runnable [`FlowGraph`] through a
//! [`NodeRegistry`].

use crate::connection::ConnectedPin;
use crate::context::FinishPolicy;
use crate::error::{FlowError, Result};
use crate::graph::FlowGraph;
use crate::node::{NodeId, SignalMode};
use crate::registry::NodeRegistry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current asset format version
pub const ASSET_FORMAT_VERSION: u32 = 1;

/// Serializable flow graph description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowAsset {
    /// Format version
    pub version: u32,
    /// Graph name
    pub name: String,
    /// Terminal state for finishing nodes
    pub finish_policy: FinishPolicy,
    /// Node definitions, in graph order
    pub nodes: Vec<NodeDefinition>,
}

impl Default for FlowAsset {
    fn default() -> Self {
        Self {
            version: ASSET_FORMAT_VERSION,
            name: "Untitled".to_string(),
            finish_policy: FinishPolicy::default(),
            nodes: Vec::new(),
        }
    }
}

/// One node in an asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDefinition {
    /// Node ID, stable across saves
    pub id: NodeId,
    /// Registry class ID
    pub class: String,
    /// Signal mode
    pub signal_mode: SignalMode,
    /// Replacement input pin names
    pub input_pins: Option<Vec<String>>,
    /// Replacement output pin names
    pub output_pins: Option<Vec<String>>,
    /// Class-specific properties
    pub properties: IndexMap<String, String>,
    /// Output pin name to target
    pub connections: IndexMap<String, ConnectedPin>,
}

impl Default for NodeDefinition {
    fn default() -> Self {
        Self {
            id: NodeId::new(),
            class: String::new(),
            signal_mode: SignalMode::Enabled,
            input_pins: None,
            output_pins: None,
            properties: IndexMap::new(),
            connections: IndexMap::new(),
        }
    }
}

impl NodeDefinition {
    /// Create a definition for a node class
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            ..Self::default()
        }
    }

    /// Set a property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Wire an output pin
    pub fn with_connection(mut self, pin_name: impl Into<String>, target: ConnectedPin) -> Self {
        self.connections.insert(pin_name.into(), target);
        self
    }
}

impl FlowAsset {
    /// Create an empty asset
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> std::result::Result<String, ron::Error> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        ron::ser::to_string_pretty(self, config)
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self> {
        let asset: FlowAsset = ron::from_str(s)?;
        if asset.version > ASSET_FORMAT_VERSION {
            return Err(FlowError::UnsupportedFileVersion {
                kind: "Flow asset",
                found: asset.version,
                supported: ASSET_FORMAT_VERSION,
            });
        }
        Ok(asset)
    }

    /// Load from a RON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let asset = Self::from_ron(&content)?;
        tracing::info!(path = %path.display(), nodes = asset.nodes.len(), "Loaded flow asset");
        Ok(asset)
    }

    /// Save to a RON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_ron()?;
        std::fs::write(path, content)?;
        tracing::info!(path = %path.display(), "Saved flow asset");
        Ok(())
    }

    /// Build a runnable graph
    ///
    /// Unknown classes, rejected property values and invalid wiring fail the
    /// whole asset. Unsupported signal modes and unknown properties are
    /// logged and ignored.
    pub fn instantiate(&self, registry: &NodeRegistry) -> Result<FlowGraph> {
        let mut graph = FlowGraph::new(self.name.clone()).with_finish_policy(self.finish_policy);

        for definition in &self.nodes {
            let mut node = registry.create_node(&definition.class)?;
            let base = node.base_mut();
            base.set_id(definition.id);

            if let Some(pins) = &definition.input_pins {
                let names: Vec<&str> = pins.iter().map(String::as_str).collect();
                base.rebuild_input_pins(&names);
            }
            if let Some(pins) = &definition.output_pins {
                let names: Vec<&str> = pins.iter().map(String::as_str).collect();
                base.rebuild_output_pins(&names);
            }
            if base.set_signal_mode(definition.signal_mode).is_err() {
                tracing::warn!(
                    node = %definition.id,
                    mode = ?definition.signal_mode,
                    "Keeping default signal mode"
                );
            }

            for (name, value) in &definition.properties {
                if !node.apply_property(name, value)? {
                    tracing::warn!(
                        node = %definition.id,
                        class = %definition.class,
                        property = %name,
                        "Unknown property ignored"
                    );
                }
            }

            graph.add_boxed_node(node);
        }

        for definition in &self.nodes {
            for (pin_name, target) in &definition.connections {
                graph.connect(definition.id, pin_name, target.node_id, &target.pin_name)?;
            }
        }

        if let Err(cycle) = graph.check_cycles() {
            tracing::debug!(graph = %self.name, "{cycle}");
        }

        tracing::debug!(graph = %self.name, nodes = graph.node_count(), "Instantiated flow asset");
        Ok(graph)
    }
}

impl FlowGraph {
    /// Build a graph from an asset using the given registry
    pub fn from_asset(asset: &FlowAsset, registry: &NodeRegistry) -> Result<Self> {
        asset.instantiate(registry)
    }
}
