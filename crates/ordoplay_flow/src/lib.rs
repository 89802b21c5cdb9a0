// SPDX-License-Identifier: MIT OR Apache-2.0
//! Flow graph runtime for `OrdoPlay`.
//!
//! Nodes receive signals on named input pins, run their logic and fire
//! output pins that are wired to inputs of other nodes. This crate provides:
//! - Node activation lifecycle and signal modes (enabled, disabled, pass-through)
//! - Pins, numbered pins and add-on pins
//! - Signal propagation through a [`FlowGraph`]
//! - Per-pin activation records for debugging
//! - Save/restore of node runtime state
//! - Graph search by node type
//! - RON flow assets and a registry of built-in nodes
//!
//! ## Architecture
//!
//! Node types embed a [`NodeBase`] and implement [`FlowNode`]. The activation
//! engine ([`NodeEngine`]) is implemented for every node and talks to the
//! graph through [`FlowContext`].

pub mod addon;
pub mod asset;
pub mod connection;
pub mod context;
pub mod engine;
pub mod error;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod observer;
pub mod persistence;
pub mod pin;
pub mod registry;
pub mod search;
pub mod settings;
pub mod time;

#[cfg(test)]
mod testing;

pub use addon::{NodeAddOn, PinAddOn};
pub use asset::{FlowAsset, NodeDefinition};
pub use connection::{ConnectedPin, Connections};
pub use context::{FinishPolicy, FlowContext, NodeInfo};
pub use engine::NodeEngine;
pub use error::{FlowError, Result};
pub use graph::{ConnectionError, CycleError, FlowGraph};
pub use node::{ActivationState, FlowNode, NodeBase, NodeId, SignalMode};
pub use observer::{GraphObserver, TraversalEvent, TraversalLog};
pub use persistence::{FlowSaveData, MemorySaveStore, NodeSaveData, SaveStore};
pub use pin::{Pin, PinActivationType, PinDirection, PinRecord};
pub use registry::NodeRegistry;
pub use search::{find_nodes_by_class, find_nodes_of_type};
pub use settings::FlowSettings;
pub use time::{ManualClock, SystemClock, TimeSource};
