// SPDX-License-Identifier: MIT OR Apache-2.0
//! Instrumented nodes shared by unit tests.

use crate::context::FlowContext;
use crate::engine::NodeEngine;
use crate::error::Result;
use crate::node::{FlowNode, NodeBase, NodeId};
use crate::persistence::{decode_state, encode_state};
use crate::pin::Pin;
use crate::search::find_nodes_of_type;
use std::any::Any;

/// Counts every hook call and optionally forwards inputs to an output
#[derive(Debug, Default)]
pub(crate) struct Tally {
    base: NodeBase,
    pub activations: usize,
    pub executed: Vec<String>,
    pub cleanups: usize,
    pub passes: usize,
    pub saves: usize,
    pub loads: usize,
    pub counter: u32,
    forward: Option<(String, bool)>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inputs<P: Into<Pin>>(mut self, pins: impl IntoIterator<Item = P>) -> Self {
        self.base = self.base.with_inputs(pins);
        self
    }

    /// Fire `pin` whenever any input executes
    pub fn forwarding(mut self, pin: &str, finish: bool) -> Self {
        self.forward = Some((pin.to_string(), finish));
        self
    }
}

impl FlowNode for Tally {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn class_name(&self) -> &str {
        "Tally"
    }

    fn on_activate(&mut self, _cx: &mut dyn FlowContext) {
        self.activations += 1;
    }

    fn execute_input(&mut self, cx: &mut dyn FlowContext, pin_name: &str) {
        self.executed.push(pin_name.to_string());
        self.counter += 1;
        if let Some((pin, finish)) = self.forward.clone() {
            self.trigger_output(cx, &pin, finish);
        }
    }

    fn on_pass_through(&mut self, cx: &mut dyn FlowContext) {
        self.passes += 1;
        self.pass_through(cx);
    }

    fn cleanup(&mut self, _cx: &mut dyn FlowContext) {
        self.cleanups += 1;
    }

    fn on_save(&mut self) {
        self.saves += 1;
    }

    fn on_load(&mut self, _cx: &mut dyn FlowContext) {
        self.loads += 1;
    }

    fn save_state(&self) -> Result<Vec<u8>> {
        encode_state(&self.counter)
    }

    fn load_state(&mut self, data: &[u8]) -> Result<()> {
        self.counter = decode_state(data)?;
        Ok(())
    }
}

/// Queries the graph from inside `execute_input`
#[derive(Debug, Default)]
pub(crate) struct Inspector {
    base: NodeBase,
    /// Where to start looking for `Tally` nodes
    pub search_from: Option<NodeId>,
    pub input_connected: Option<bool>,
    pub found: Vec<NodeId>,
}

impl FlowNode for Inspector {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn class_name(&self) -> &str {
        "Inspector"
    }

    fn execute_input(&mut self, cx: &mut dyn FlowContext, pin_name: &str) {
        self.input_connected = Some(self.is_input_connected(cx, pin_name));
        if let Some(start) = self.search_from {
            self.found.clear();
            find_nodes_of_type::<Tally>(cx, start, 8, &mut self.found);
        }
    }
}
