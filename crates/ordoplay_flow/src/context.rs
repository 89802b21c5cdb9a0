// SPDX-License-Identifier: MIT OR Apache-2.0
//! The graph service a node sees while it executes.

use crate::connection::Connections;
use crate::node::{ActivationState, FlowNode, NodeId};
use crate::pin::PinActivationType;
use crate::settings::FlowSettings;
use serde::{Deserialize, Serialize};
use std::any::TypeId;

/// Terminal state given to nodes that finish or get deactivated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FinishPolicy {
    /// Finishing nodes end up `Completed`
    #[default]
    Complete,
    /// Finishing nodes end up `Aborted`
    Abort,
}

/// Identity and wiring of a node, available even while it executes
#[derive(Debug, Clone, Copy)]
pub struct NodeInfo<'a> {
    /// Node ID
    pub id: NodeId,
    /// Concrete node type
    pub type_id: TypeId,
    /// Class name reported by the node
    pub class_name: &'a str,
    /// Outbound connections
    pub connections: &'a Connections,
}

impl<'a> NodeInfo<'a> {
    /// Describe a node
    pub fn of(node: &'a dyn FlowNode) -> Self {
        Self {
            id: node.base().id(),
            type_id: node.as_any().type_id(),
            class_name: node.class_name(),
            connections: node.base().connections(),
        }
    }

    /// Whether the node has concrete type `T`
    pub fn is<T: FlowNode>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

/// Graph-side collaborator of the activation engine.
///
/// A node is lent out by the graph while it executes, and stays lent until
/// every signal it fired has returned. So during a call `node` returns
/// `None` for the executing node and for every upstream node still on the
/// call stack. `node_info` covers all nodes, lent or not.
pub trait FlowContext {
    /// Look up a node that is not currently executing
    fn node(&self, node_id: NodeId) -> Option<&(dyn FlowNode + 'static)>;

    /// Identity and wiring of any node in the graph
    fn node_info(&self, node_id: NodeId) -> Option<NodeInfo<'_>>;

    /// IDs of every node in the graph
    fn node_ids(&self) -> Vec<NodeId>;

    /// Deliver a signal to a node's input pin
    fn trigger_input(
        &mut self,
        node_id: NodeId,
        pin_name: &str,
        activation_type: PinActivationType,
    );

    /// A node finished; update bookkeeping
    fn finish_node(&mut self, node_id: NodeId);

    /// A node's activation state was restored from save data
    fn on_activation_state_loaded(&mut self, node_id: NodeId, state: ActivationState);

    /// Terminal state for finishing nodes
    fn finish_policy(&self) -> FinishPolicy;

    /// Runtime settings
    fn settings(&self) -> &FlowSettings;

    /// Current time from the time source
    fn current_time(&self) -> f64;

    /// Visualization hook for a triggered input pin
    fn notify_input_triggered(&mut self, _node_id: NodeId, _pin_index: usize) {}

    /// Visualization hook for a triggered output pin
    fn notify_output_triggered(&mut self, _node_id: NodeId, _pin_index: usize) {}
}
