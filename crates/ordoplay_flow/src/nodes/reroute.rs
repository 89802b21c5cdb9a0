// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reroute node: a wiring helper with no logic of its own.

use crate::context::FlowContext;
use crate::engine::NodeEngine;
use crate::node::{FlowNode, NodeBase};
use std::any::Any;

/// Forwards `In` to `Out` and finishes
#[derive(Debug, Default)]
pub struct Reroute {
    base: NodeBase,
}

impl Reroute {
    /// Registry class ID
    pub const CLASS: &'static str = "Reroute";

    /// Create a reroute node
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlowNode for Reroute {
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
        Self::CLASS
    }

    fn execute_input(&mut self, cx: &mut dyn FlowContext, _pin_name: &str) {
        self.trigger_first_output(cx, true);
    }
}
