// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node activation and signal propagation.
//!
//! Execution is a plain call stack: `trigger_input` runs node logic, node
//! logic calls `trigger_output`, and a connected output asks the graph to
//! `trigger_input` the next node. Nothing here returns an error: unknown pins
//! are logged and the signal is dropped so stale content cannot stop a
//! running graph.

use crate::context::{FinishPolicy, FlowContext};
use crate::error::Result;
use crate::node::{ActivationState, FlowNode, SignalMode};
use crate::persistence::{NodeArchive, NodeSaveData, NODE_ARCHIVE_VERSION};
use crate::pin::{PinActivationType, PinRecord};

/// Activation engine, available on every [`FlowNode`]
pub trait NodeEngine {
    /// Deliver a signal to one of this node's input pins
    fn trigger_input(
        &mut self,
        cx: &mut dyn FlowContext,
        pin_name: &str,
        activation_type: PinActivationType,
    );

    /// Fire an output pin, optionally finishing the node first
    fn trigger_output(&mut self, cx: &mut dyn FlowContext, pin_name: &str, finish: bool) {
        self.trigger_output_with(cx, pin_name, finish, PinActivationType::Default);
    }

    /// Fire an output pin with an explicit activation type
    fn trigger_output_with(
        &mut self,
        cx: &mut dyn FlowContext,
        pin_name: &str,
        finish: bool,
        activation_type: PinActivationType,
    );

    /// Fire the first output pin, if the node has one
    fn trigger_first_output(&mut self, cx: &mut dyn FlowContext, finish: bool);

    /// Re-fire every connected output in pin order, then finish
    fn pass_through(&mut self, cx: &mut dyn FlowContext);

    /// Deactivate and tell the graph the node is done
    fn finish(&mut self, cx: &mut dyn FlowContext);

    /// Enter the terminal state chosen by the finish policy and clean up
    fn deactivate(&mut self, cx: &mut dyn FlowContext);

    /// Back to `NeverActivated` with empty activation logs
    fn reset_records(&mut self);

    /// Mark content as preloaded and run the preload hook
    fn trigger_preload(&mut self);

    /// Clear the preload mark and run the flush hook
    fn trigger_flush(&mut self);

    /// Write the node's runtime state into a save record
    fn save_instance(&mut self) -> Result<NodeSaveData>;

    /// Restore runtime state from a save record and resume by signal mode
    fn load_instance(&mut self, cx: &mut dyn FlowContext, record: &NodeSaveData) -> Result<()>;

    /// Whether any other node in the graph is wired to this input pin
    fn is_input_connected(&self, cx: &dyn FlowContext, pin_name: &str) -> bool;
}

impl<N: FlowNode + ?Sized> NodeEngine for N {
    fn trigger_input(
        &mut self,
        cx: &mut dyn FlowContext,
        pin_name: &str,
        activation_type: PinActivationType,
    ) {
        let node_id = self.base().id();
        let signal_mode = self.base().signal_mode();

        if signal_mode == SignalMode::Disabled {
            if cx.settings().log_on_signal_disabled {
                tracing::info!(
                    node = %node_id,
                    pin = pin_name,
                    "Node disabled while triggering input"
                );
            }
            return;
        }

        let Some(pin_index) = self.base().input_pin_index(pin_name) else {
            tracing::error!(
                node = %node_id,
                class = self.class_name(),
                pin = pin_name,
                "Input pin name invalid"
            );
            return;
        };

        if signal_mode == SignalMode::Enabled {
            if self.base().activation_state() != ActivationState::Active {
                for add_on in self.base_mut().add_ons_mut() {
                    add_on.on_activate();
                }
                self.on_activate(cx);
            }

            let now = cx.current_time();
            let base = self.base_mut();
            base.activation_state = ActivationState::Active;
            base.activated_time = now;
        }

        if cx.settings().record_pin_activations {
            let record = PinRecord::new(cx.current_time(), activation_type);
            self.base_mut().record_input(pin_name, record);
        }
        cx.notify_input_triggered(node_id, pin_index);

        tracing::trace!(node = %node_id, pin = pin_name, ?signal_mode, "Input triggered");
        match signal_mode {
            SignalMode::Enabled => self.execute_input(cx, pin_name),
            SignalMode::PassThrough => {
                if cx.settings().log_on_signal_passthrough {
                    tracing::info!(
                        node = %node_id,
                        pin = pin_name,
                        "Signal pass-through on triggering input"
                    );
                }
                self.on_pass_through(cx);
            }
            SignalMode::Disabled => {}
        }
    }

    fn trigger_output_with(
        &mut self,
        cx: &mut dyn FlowContext,
        pin_name: &str,
        finish: bool,
        activation_type: PinActivationType,
    ) {
        // Clean up before anything downstream runs, so a node further down
        // cannot call back into an upstream node that is still mid-finish.
        if finish {
            self.finish(cx);
        }

        let node_id = self.base().id();
        let Some(pin_index) = self.base().output_pin_index(pin_name) else {
            tracing::error!(
                node = %node_id,
                class = self.class_name(),
                pin = pin_name,
                "Output pin name invalid"
            );
            return;
        };

        // recorded even when nothing is connected
        if cx.settings().record_pin_activations {
            let record = PinRecord::new(cx.current_time(), activation_type);
            self.base_mut().record_output(pin_name, record);
        }
        cx.notify_output_triggered(node_id, pin_index);

        match self.base().connections().get(pin_name).cloned() {
            Some(target) => {
                tracing::trace!(
                    node = %node_id,
                    pin = pin_name,
                    target = %target.node_id,
                    "Output triggered"
                );
                cx.trigger_input(target.node_id, &target.pin_name, PinActivationType::Default);
            }
            None => {
                tracing::trace!(
                    node = %node_id,
                    pin = pin_name,
                    "Output triggered with no connection"
                );
            }
        }
    }

    fn trigger_first_output(&mut self, cx: &mut dyn FlowContext, finish: bool) {
        if let Some(pin) = self.base().output_pins().first() {
            let pin_name = pin.name.clone();
            self.trigger_output(cx, &pin_name, finish);
        }
    }

    fn pass_through(&mut self, cx: &mut dyn FlowContext) {
        let connected: Vec<String> = self
            .base()
            .output_pins()
            .iter()
            .filter(|pin| self.base().connections().contains(&pin.name))
            .map(|pin| pin.name.clone())
            .collect();

        for pin_name in &connected {
            self.trigger_output_with(cx, pin_name, false, PinActivationType::PassThrough);
        }

        // finished nodes are left out of new save data
        self.finish(cx);
    }

    fn finish(&mut self, cx: &mut dyn FlowContext) {
        self.deactivate(cx);
        cx.finish_node(self.base().id());
    }

    fn deactivate(&mut self, cx: &mut dyn FlowContext) {
        let state = match cx.finish_policy() {
            FinishPolicy::Abort => ActivationState::Aborted,
            FinishPolicy::Complete => ActivationState::Completed,
        };
        self.base_mut().activation_state = state;

        for add_on in self.base_mut().add_ons_mut() {
            add_on.cleanup();
        }
        self.cleanup(cx);
    }

    fn reset_records(&mut self) {
        let base = self.base_mut();
        base.activation_state = ActivationState::NeverActivated;
        base.clear_records();
    }

    fn trigger_preload(&mut self) {
        self.base_mut().preloaded = true;
        self.preload_content();
    }

    fn trigger_flush(&mut self) {
        self.base_mut().preloaded = false;
        self.flush_content();
    }

    fn save_instance(&mut self) -> Result<NodeSaveData> {
        self.on_save();

        let archive = snapshot(self)?;
        Ok(NodeSaveData {
            node_id: self.base().id(),
            data: archive.encode()?,
        })
    }

    fn load_instance(&mut self, cx: &mut dyn FlowContext, record: &NodeSaveData) -> Result<()> {
        let archive = NodeArchive::decode(&record.data)?;
        apply_archive(self, &archive)?;
        resume_loaded(self, cx);
        Ok(())
    }

    fn is_input_connected(&self, cx: &dyn FlowContext, pin_name: &str) -> bool {
        let node_id = self.base().id();
        cx.node_ids()
            .into_iter()
            .filter(|other| *other != node_id)
            .filter_map(|other| cx.node_info(other))
            .any(|info| info.connections.targets(node_id, pin_name))
    }
}

/// Runtime fields of a node as an archive, without running `on_save`
pub(crate) fn snapshot<N: FlowNode + ?Sized>(node: &N) -> Result<NodeArchive> {
    Ok(NodeArchive {
        version: NODE_ARCHIVE_VERSION,
        activation_state: node.base().activation_state(),
        activated_time: node.base().activated_time(),
        custom: node.save_state()?,
    })
}

/// Write an archive into a node; shared fields change only if `load_state` succeeds
pub(crate) fn apply_archive<N: FlowNode + ?Sized>(
    node: &mut N,
    archive: &NodeArchive,
) -> Result<()> {
    node.load_state(&archive.custom)?;
    let base = node.base_mut();
    base.activation_state = archive.activation_state;
    base.activated_time = archive.activated_time;
    Ok(())
}

/// Report restored state to the graph and resume by signal mode
pub(crate) fn resume_loaded<N: FlowNode + ?Sized>(node: &mut N, cx: &mut dyn FlowContext) {
    let node_id = node.base().id();
    cx.on_activation_state_loaded(node_id, node.base().activation_state());

    match node.base().signal_mode() {
        SignalMode::Enabled => node.on_load(cx),
        SignalMode::Disabled => {
            // disabled after the save was taken: never resume
            tracing::info!(node = %node_id, "Signal disabled while loading node from save data");
            node.finish(cx);
        }
        SignalMode::PassThrough => {
            tracing::info!(node = %node_id, "Signal pass-through on loading node from save data");
            node.on_pass_through(cx);
        }
    }
}
