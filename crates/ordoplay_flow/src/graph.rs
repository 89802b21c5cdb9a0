// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph instance owning nodes and routing signals between them.

use crate::connection::{ConnectedPin, Connections};
use crate::context::{FinishPolicy, FlowContext, NodeInfo};
use crate::engine::{self, NodeEngine};
use crate::error::{FlowError, Result};
use crate::node::{ActivationState, FlowNode, NodeId, SignalMode};
use crate::observer::GraphObserver;
use crate::persistence::{FlowSaveData, NodeArchive, NodeSaveData, SaveStore};
use crate::pin::PinActivationType;
use crate::settings::FlowSettings;
use crate::time::{SystemClock, TimeSource};
use indexmap::{IndexMap, IndexSet};
use std::any::TypeId;
use std::collections::{HashSet, VecDeque};

/// Signal waiting for a busy node
#[derive(Debug, Clone)]
struct PendingSignal {
    node_id: NodeId,
    pin_name: String,
    activation_type: PinActivationType,
}

/// What stays in a slot while its node is lent out
struct LentNode {
    type_id: TypeId,
    class_name: String,
    connections: Connections,
}

enum Slot {
    Idle(Box<dyn FlowNode>),
    /// Executing, or upstream of the executing node
    Lent(LentNode),
}

impl Slot {
    fn info(&self, node_id: NodeId) -> NodeInfo<'_> {
        match self {
            Self::Idle(node) => NodeInfo::of(&**node),
            Self::Lent(lent) => NodeInfo {
                id: node_id,
                type_id: lent.type_id,
                class_name: &lent.class_name,
                connections: &lent.connections,
            },
        }
    }

    fn idle(&self) -> Option<&(dyn FlowNode + 'static)> {
        match self {
            Self::Idle(node) => Some(node.as_ref()),
            Self::Lent(_) => None,
        }
    }

    fn idle_mut(&mut self) -> Option<&mut (dyn FlowNode + 'static)> {
        match self {
            Self::Idle(node) => Some(node.as_mut()),
            Self::Lent(_) => None,
        }
    }

    /// Take the node out, leaving its identity and wiring behind
    fn lend(&mut self) -> Option<Box<dyn FlowNode>> {
        let Self::Idle(node) = self else {
            return None;
        };
        let lent = LentNode {
            type_id: node.as_any().type_id(),
            class_name: node.class_name().to_string(),
            connections: node.base().connections().clone(),
        };
        match std::mem::replace(self, Self::Lent(lent)) {
            Self::Idle(node) => Some(node),
            Self::Lent(_) => None,
        }
    }
}

/// A running flow graph
///
/// While a node executes it is lent out of the graph, and so is every
/// upstream node still waiting for its signal to return. Signals that reach
/// a lent node are queued and delivered once the outermost dispatch has
/// unwound. Lent nodes keep their identity and wiring visible through
/// [`FlowContext::node_info`].
pub struct FlowGraph {
    /// Graph name
    pub name: String,
    finish_policy: FinishPolicy,
    settings: FlowSettings,
    nodes: IndexMap<NodeId, Slot>,
    active_nodes: IndexSet<NodeId>,
    recorded_nodes: IndexSet<NodeId>,
    clock: Box<dyn TimeSource>,
    observer: Option<Box<dyn GraphObserver>>,
    depth: usize,
    deferred: VecDeque<PendingSignal>,
    flushing: bool,
}

impl FlowGraph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            finish_policy: FinishPolicy::default(),
            settings: FlowSettings::default(),
            nodes: IndexMap::new(),
            active_nodes: IndexSet::new(),
            recorded_nodes: IndexSet::new(),
            clock: Box::new(SystemClock::new()),
            observer: None,
            depth: 0,
            deferred: VecDeque::new(),
            flushing: false,
        }
    }

    /// Set the runtime settings
    pub fn with_settings(mut self, settings: FlowSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the finish policy
    pub fn with_finish_policy(mut self, policy: FinishPolicy) -> Self {
        self.finish_policy = policy;
        self
    }

    /// Set the time source
    pub fn with_clock(mut self, clock: impl TimeSource + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Set the traversal observer
    pub fn with_observer(mut self, observer: impl GraphObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Replace or remove the traversal observer
    pub fn set_observer(&mut self, observer: Option<Box<dyn GraphObserver>>) {
        self.observer = observer;
    }

    /// Runtime settings
    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    /// Mutable runtime settings
    pub fn settings_mut(&mut self) -> &mut FlowSettings {
        &mut self.settings
    }

    /// Finish policy
    pub fn finish_policy(&self) -> FinishPolicy {
        self.finish_policy
    }

    /// Change the finish policy
    pub fn set_finish_policy(&mut self, policy: FinishPolicy) {
        self.finish_policy = policy;
    }

    // Nodes

    /// Add a node to the graph
    pub fn add_node(&mut self, node: impl FlowNode) -> NodeId {
        self.add_boxed_node(Box::new(node))
    }

    /// Add a boxed node to the graph
    pub fn add_boxed_node(&mut self, node: Box<dyn FlowNode>) -> NodeId {
        let id = node.base().id();
        if self.nodes.insert(id, Slot::Idle(node)).is_some() {
            tracing::warn!(graph = %self.name, node = %id, "Replaced node with duplicate ID");
        }
        id
    }

    /// Remove a node and every connection targeting it
    ///
    /// A node that is currently executing cannot be removed.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Box<dyn FlowNode>> {
        if matches!(self.nodes.get(&node_id)?, Slot::Lent(_)) {
            tracing::warn!(graph = %self.name, node = %node_id, "Cannot remove executing node");
            return None;
        }
        let Some(Slot::Idle(node)) = self.nodes.shift_remove(&node_id) else {
            return None;
        };
        for other in self.nodes.values_mut().filter_map(Slot::idle_mut) {
            other.base_mut().connections_mut().remove_node(node_id);
        }
        self.active_nodes.shift_remove(&node_id);
        self.recorded_nodes.shift_remove(&node_id);
        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&(dyn FlowNode + 'static)> {
        self.nodes.get(&node_id)?.idle()
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut (dyn FlowNode + 'static)> {
        self.nodes.get_mut(&node_id)?.idle_mut()
    }

    /// Get a node by ID as its concrete type
    pub fn node_as<T: FlowNode>(&self, node_id: NodeId) -> Option<&T> {
        self.node(node_id)?.downcast_ref::<T>()
    }

    /// Get a mutable node by ID as its concrete type
    pub fn node_as_mut<T: FlowNode>(&mut self, node_id: NodeId) -> Option<&mut T> {
        self.node_mut(node_id)?.downcast_mut::<T>()
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &(dyn FlowNode + 'static)> {
        self.nodes.values().filter_map(Slot::idle)
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // Connections

    /// Wire an output pin to an input pin
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_pin: &str,
        to_node: NodeId,
        to_pin: &str,
    ) -> std::result::Result<(), ConnectionError> {
        // Validate nodes and pins exist
        let target = self
            .node(to_node)
            .ok_or(ConnectionError::NodeNotFound(to_node))?;
        if !target.base().has_input_pin(to_pin) {
            return Err(ConnectionError::PinNotFound {
                node_id: to_node,
                pin_name: to_pin.to_string(),
            });
        }

        let source = self
            .node(from_node)
            .ok_or(ConnectionError::NodeNotFound(from_node))?;
        if !source.base().has_output_pin(from_pin) {
            return Err(ConnectionError::PinNotFound {
                node_id: from_node,
                pin_name: from_pin.to_string(),
            });
        }

        // One target per output pin
        if source.base().connections().contains(from_pin) {
            return Err(ConnectionError::PinAlreadyConnected {
                node_id: from_node,
                pin_name: from_pin.to_string(),
            });
        }

        // Prevent self-loops
        if from_node == to_node {
            return Err(ConnectionError::SelfLoop);
        }

        if let Some(source) = self.node_mut(from_node) {
            source
                .base_mut()
                .connections_mut()
                .insert(from_pin, ConnectedPin::new(to_node, to_pin));
        }
        Ok(())
    }

    /// Unwire an output pin
    pub fn disconnect(&mut self, from_node: NodeId, from_pin: &str) -> Option<ConnectedPin> {
        self.node_mut(from_node)?
            .base_mut()
            .connections_mut()
            .remove(from_pin)
    }

    /// Whether any node is wired to the given input pin
    pub fn is_input_connected(&self, node_id: NodeId, pin_name: &str) -> bool {
        self.nodes
            .iter()
            .filter(|(id, _)| **id != node_id)
            .any(|(id, slot)| slot.info(*id).connections.targets(node_id, pin_name))
    }

    /// Check the wiring for cycles
    ///
    /// Cycles are legal at runtime (re-entry is queued), this is for tooling
    /// that wants to warn about them.
    pub fn check_cycles(&self) -> std::result::Result<(), CycleError> {
        let mut visited = HashSet::new();
        let mut temp_mark = HashSet::new();

        for node_id in self.nodes.keys() {
            if !visited.contains(node_id) {
                self.visit(*node_id, &mut visited, &mut temp_mark)?;
            }
        }
        Ok(())
    }

    fn visit(
        &self,
        node_id: NodeId,
        visited: &mut HashSet<NodeId>,
        temp_mark: &mut HashSet<NodeId>,
    ) -> std::result::Result<(), CycleError> {
        if temp_mark.contains(&node_id) {
            return Err(CycleError(node_id));
        }
        if visited.contains(&node_id) {
            return Ok(());
        }

        temp_mark.insert(node_id);

        // Visit every node this one signals
        if let Some(slot) = self.nodes.get(&node_id) {
            for next in slot.info(node_id).connections.connected_node_ids() {
                self.visit(next, visited, temp_mark)?;
            }
        }

        temp_mark.remove(&node_id);
        visited.insert(node_id);
        Ok(())
    }

    // Execution

    /// Deliver a signal to a node's input pin
    pub fn trigger_input(&mut self, node_id: NodeId, pin_name: &str) {
        self.dispatch(node_id, pin_name, PinActivationType::Default);
    }

    /// Deliver a signal by hand, e.g. from a debugger
    pub fn force_input(&mut self, node_id: NodeId, pin_name: &str) {
        self.dispatch(node_id, pin_name, PinActivationType::Forced);
    }

    /// Fire an output pin of a node from outside the graph
    pub fn trigger_output(&mut self, node_id: NodeId, pin_name: &str, finish: bool) {
        let pin_name = pin_name.to_string();
        let handled = self.with_node(node_id, |node, graph| {
            node.trigger_output(graph, &pin_name, finish);
        });
        if handled.is_none() {
            tracing::error!(
                graph = %self.name,
                node = %node_id,
                "Cannot trigger output of unknown or busy node"
            );
        }
        if self.depth == 0 {
            self.flush_deferred();
        }
    }

    /// Reset every node and trigger the first input pin of `entry`
    pub fn start_flow(&mut self, entry: NodeId) -> Result<()> {
        self.reset_records();

        let node = self.node(entry).ok_or(FlowError::NodeNotFound(entry))?;
        let Some(pin_name) = node.base().input_pins().first().map(|pin| pin.name.clone()) else {
            tracing::warn!(graph = %self.name, node = %entry, "Entry node has no input pins");
            return Ok(());
        };

        tracing::info!(graph = %self.name, node = %entry, "Starting flow");
        self.dispatch(entry, &pin_name, PinActivationType::Default);
        Ok(())
    }

    /// Deactivate every active node under the given policy
    pub fn finish_flow(&mut self, policy: FinishPolicy) {
        self.finish_policy = policy;

        let active: Vec<NodeId> = self.active_nodes.iter().copied().collect();
        for node_id in active {
            self.with_node(node_id, |node, graph| node.deactivate(graph));
        }
        self.active_nodes.clear();
        if self.depth == 0 {
            self.flush_deferred();
        }

        tracing::info!(graph = %self.name, ?policy, "Finished flow");
    }

    /// Reset every node's activation state and records
    pub fn reset_records(&mut self) {
        for node in self.nodes.values_mut().filter_map(Slot::idle_mut) {
            node.reset_records();
        }
        self.active_nodes.clear();
        self.recorded_nodes.clear();
        self.deferred.clear();
    }

    /// Preload content of every node
    pub fn preload_content(&mut self) {
        for node in self.nodes.values_mut().filter_map(Slot::idle_mut) {
            node.trigger_preload();
        }
    }

    /// Flush preloaded content of every node
    pub fn flush_content(&mut self) {
        for node in self.nodes.values_mut().filter_map(Slot::idle_mut) {
            node.trigger_flush();
        }
    }

    /// Nodes currently active
    pub fn active_node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.active_nodes.iter().copied()
    }

    /// Nodes that received a signal since the last reset
    pub fn recorded_node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.recorded_nodes.iter().copied()
    }

    /// Whether a node is active
    pub fn is_node_active(&self, node_id: NodeId) -> bool {
        self.active_nodes.contains(&node_id)
    }

    /// Whether no node is active
    pub fn is_finished(&self) -> bool {
        self.active_nodes.is_empty()
    }

    fn dispatch(&mut self, node_id: NodeId, pin_name: &str, activation_type: PinActivationType) {
        if self.depth >= self.settings.max_propagation_depth {
            tracing::error!(
                graph = %self.name,
                node = %node_id,
                pin = pin_name,
                depth = self.depth,
                "Propagation depth limit reached, dropping signal"
            );
            return;
        }

        let Some(slot) = self.nodes.get_mut(&node_id) else {
            tracing::error!(
                graph = %self.name,
                node = %node_id,
                pin = pin_name,
                "Signal addressed to unknown node"
            );
            return;
        };
        let Some(mut node) = slot.lend() else {
            tracing::debug!(
                graph = %self.name,
                node = %node_id,
                pin = pin_name,
                "Node is executing, deferring signal"
            );
            self.deferred.push_back(PendingSignal {
                node_id,
                pin_name: pin_name.to_string(),
                activation_type,
            });
            return;
        };

        // disabled nodes and unknown pins drop the signal
        let accepted = node.base().signal_mode() != SignalMode::Disabled
            && node.base().has_input_pin(pin_name);

        self.depth += 1;
        node.trigger_input(self, pin_name, activation_type);
        self.depth -= 1;
        self.restore(node_id, node);
        if accepted {
            self.recorded_nodes.insert(node_id);
        }

        if self.depth == 0 {
            self.flush_deferred();
        }
    }

    fn flush_deferred(&mut self) {
        if self.flushing {
            return;
        }
        self.flushing = true;

        let mut delivered = 0;
        while let Some(signal) = self.deferred.pop_front() {
            if delivered >= self.settings.max_deferred_signals {
                tracing::error!(
                    graph = %self.name,
                    dropped = self.deferred.len() + 1,
                    "Deferred signal limit reached, dropping remaining signals"
                );
                self.deferred.clear();
                break;
            }
            delivered += 1;
            self.dispatch(signal.node_id, &signal.pin_name, signal.activation_type);
        }

        self.flushing = false;
    }

    /// Lend a node out for a call that needs the graph as context
    ///
    /// Counts as one level of propagation depth, so signals looping back to
    /// the lent node stay queued until the caller flushes.
    fn with_node<R>(
        &mut self,
        node_id: NodeId,
        f: impl FnOnce(&mut dyn FlowNode, &mut Self) -> R,
    ) -> Option<R> {
        let mut node = self.nodes.get_mut(&node_id)?.lend()?;
        self.depth += 1;
        let result = f(&mut *node, self);
        self.depth -= 1;
        self.restore(node_id, node);
        Some(result)
    }

    fn restore(&mut self, node_id: NodeId, node: Box<dyn FlowNode>) {
        let active = node.base().activation_state() == ActivationState::Active;
        if let Some(slot) = self.nodes.get_mut(&node_id) {
            *slot = Slot::Idle(node);
        }
        if active {
            self.active_nodes.insert(node_id);
        } else {
            self.active_nodes.shift_remove(&node_id);
        }
    }

    // Save/restore

    /// Save every active node
    pub fn save_instance(&mut self) -> Result<FlowSaveData> {
        let mut nodes = Vec::new();
        let active: Vec<NodeId> = self.active_nodes.iter().copied().collect();
        for node_id in active {
            if let Some(node) = self.node_mut(node_id) {
                nodes.push(node.save_instance()?);
            }
        }

        tracing::debug!(graph = %self.name, nodes = nodes.len(), "Saved flow instance");
        Ok(FlowSaveData {
            graph_name: self.name.clone(),
            saved_time: self.clock.current_time(),
            nodes,
        })
    }

    /// Restore nodes from save data
    ///
    /// Records for nodes no longer in the graph are skipped. Loading is all
    /// or nothing: if any record fails to decode or apply, every node keeps
    /// the state it had and nothing resumes.
    pub fn load_instance(&mut self, data: &FlowSaveData) -> Result<()> {
        let count = self.load_records(&data.nodes)?;
        tracing::debug!(graph = %self.name, nodes = count, "Loaded flow instance");
        Ok(())
    }

    /// Write every active node into a store, returning how many were written
    pub fn save_to_store(&mut self, store: &mut dyn SaveStore) -> Result<usize> {
        let data = self.save_instance()?;
        let count = data.nodes.len();
        for record in data.nodes {
            store.write(record.node_id, record.data);
        }
        Ok(count)
    }

    /// Restore every node that has a buffer in the store, returning how many
    pub fn load_from_store(&mut self, store: &dyn SaveStore) -> Result<usize> {
        let records: Vec<NodeSaveData> = self
            .nodes
            .keys()
            .filter_map(|node_id| {
                store.read(*node_id).map(|data| NodeSaveData {
                    node_id: *node_id,
                    data: data.to_vec(),
                })
            })
            .collect();
        self.load_records(&records)
    }

    /// Decode every record, apply them all, then resume the restored nodes
    fn load_records(&mut self, records: &[NodeSaveData]) -> Result<usize> {
        let mut archives = Vec::with_capacity(records.len());
        for record in records {
            if self.node(record.node_id).is_none() {
                tracing::warn!(
                    graph = %self.name,
                    node = %record.node_id,
                    "Save data for unknown or executing node skipped"
                );
                continue;
            }
            archives.push((record.node_id, NodeArchive::decode(&record.data)?));
        }

        // previous state of every node already written, for rolling back
        let mut applied: Vec<(NodeId, NodeArchive)> = Vec::with_capacity(archives.len());
        for (node_id, archive) in &archives {
            let Some(node) = self.node_mut(*node_id) else {
                continue;
            };
            let result = engine::snapshot(&*node).and_then(|previous| {
                engine::apply_archive(node, archive)?;
                Ok(previous)
            });
            match result {
                Ok(previous) => applied.push((*node_id, previous)),
                Err(err) => {
                    self.roll_back(&applied);
                    return Err(err);
                }
            }
        }

        for (node_id, _) in &applied {
            self.with_node(*node_id, |node, graph| engine::resume_loaded(node, graph));
        }
        if self.depth == 0 {
            self.flush_deferred();
        }
        Ok(applied.len())
    }

    fn roll_back(&mut self, applied: &[(NodeId, NodeArchive)]) {
        for (node_id, previous) in applied {
            let failed = match self.node_mut(*node_id) {
                Some(node) => engine::apply_archive(node, previous).err(),
                None => None,
            };
            if let Some(err) = failed {
                tracing::error!(
                    graph = %self.name,
                    node = %node_id,
                    %err,
                    "Failed to roll back node state"
                );
            }
        }
    }
}

impl Default for FlowGraph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl FlowContext for FlowGraph {
    fn node(&self, node_id: NodeId) -> Option<&(dyn FlowNode + 'static)> {
        FlowGraph::node(self, node_id)
    }

    fn node_info(&self, node_id: NodeId) -> Option<NodeInfo<'_>> {
        self.nodes.get(&node_id).map(|slot| slot.info(node_id))
    }

    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn trigger_input(
        &mut self,
        node_id: NodeId,
        pin_name: &str,
        activation_type: PinActivationType,
    ) {
        self.dispatch(node_id, pin_name, activation_type);
    }

    fn finish_node(&mut self, node_id: NodeId) {
        self.active_nodes.shift_remove(&node_id);
        tracing::trace!(graph = %self.name, node = %node_id, "Node finished");
    }

    fn on_activation_state_loaded(&mut self, node_id: NodeId, state: ActivationState) {
        if state != ActivationState::NeverActivated {
            self.recorded_nodes.insert(node_id);
        }
        if state == ActivationState::Active {
            self.active_nodes.insert(node_id);
        } else {
            self.active_nodes.shift_remove(&node_id);
        }
    }

    fn finish_policy(&self) -> FinishPolicy {
        self.finish_policy
    }

    fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    fn notify_input_triggered(&mut self, node_id: NodeId, pin_index: usize) {
        if let Some(observer) = &mut self.observer {
            observer.on_input_triggered(node_id, pin_index);
        }
    }

    fn notify_output_triggered(&mut self, node_id: NodeId, pin_index: usize) {
        if let Some(observer) = &mut self.observer {
            observer.on_output_triggered(node_id, pin_index);
        }
    }
}

/// Error when creating a connection
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Pin not found
    #[error("Pin {pin_name} not found on node {node_id}")]
    PinNotFound {
        /// Node searched
        node_id: NodeId,
        /// Missing pin
        pin_name: String,
    },

    /// Output pin already wired
    #[error("Output pin {pin_name} on node {node_id} is already connected")]
    PinAlreadyConnected {
        /// Source node
        node_id: NodeId,
        /// Wired pin
        pin_name: String,
    },

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,
}

/// Error when the wiring contains a cycle
#[derive(Debug, thiserror::Error)]
#[error("Graph contains a cycle through node {0}")]
pub struct CycleError(pub NodeId);
