// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared test node and graph helpers

#![allow(dead_code)] // Not every test file uses every helper

use ordoplay_flow::persistence::{decode_state, encode_state};
use ordoplay_flow::{
    FlowContext, FlowGraph, FlowNode, FlowSettings, NodeBase, NodeEngine, NodeId, Pin, Result,
};
use std::any::Any;

/// Node that records every hook call and can route inputs to outputs
#[derive(Debug, Default)]
pub struct Recorder {
    base: NodeBase,
    pub activations: usize,
    pub executed: Vec<String>,
    pub cleanups: usize,
    pub passes: usize,
    pub saves: usize,
    pub loads: usize,
    pub preloads: usize,
    pub value: u32,
    routes: Vec<(String, String)>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: NodeId) -> Self {
        self.base = self.base.with_id(id);
        self
    }

    pub fn with_inputs<P: Into<Pin>>(mut self, pins: impl IntoIterator<Item = P>) -> Self {
        self.base = self.base.with_inputs(pins);
        self
    }

    pub fn with_outputs<P: Into<Pin>>(mut self, pins: impl IntoIterator<Item = P>) -> Self {
        self.base = self.base.with_outputs(pins);
        self
    }

    /// Fire `output` whenever `input` executes
    pub fn route(mut self, input: &str, output: &str) -> Self {
        self.routes.push((input.to_string(), output.to_string()));
        self
    }
}

impl FlowNode for Recorder {
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
        "Recorder"
    }

    fn on_activate(&mut self, _cx: &mut dyn FlowContext) {
        self.activations += 1;
    }

    fn execute_input(&mut self, cx: &mut dyn FlowContext, pin_name: &str) {
        self.executed.push(pin_name.to_string());
        self.value += 1;

        let outputs: Vec<String> = self
            .routes
            .iter()
            .filter(|(input, _)| input == pin_name)
            .map(|(_, output)| output.clone())
            .collect();
        for output in outputs {
            self.trigger_output(cx, &output, false);
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
        encode_state(&self.value)
    }

    fn load_state(&mut self, data: &[u8]) -> Result<()> {
        self.value = decode_state(data)?;
        Ok(())
    }

    fn preload_content(&mut self) {
        self.preloads += 1;
    }
}

/// Graph with pin recording switched on
pub fn recording_graph(name: &str) -> FlowGraph {
    FlowGraph::new(name).with_settings(FlowSettings {
        record_pin_activations: true,
        ..FlowSettings::default()
    })
}

/// Typed access that panics with the node type in the message
pub fn recorder(graph: &FlowGraph, id: NodeId) -> &Recorder {
    graph
        .node_as::<Recorder>(id)
        .unwrap_or_else(|| panic!("node {id} is not a Recorder"))
}
