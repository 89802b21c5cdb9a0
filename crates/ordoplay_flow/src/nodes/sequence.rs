// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequence node: fans one signal out to numbered outputs.

use crate::context::FlowContext;
use crate::engine::NodeEngine;
use crate::error::{FlowError, Result};
use crate::node::{FlowNode, NodeBase};
use std::any::Any;

/// Fires outputs "0", "1", ... in order, finishing before the last one
#[derive(Debug)]
pub struct Sequence {
    base: NodeBase,
}

impl Sequence {
    /// Registry class ID
    pub const CLASS: &'static str = "Sequence";

    /// Create a sequence with two outputs
    pub fn new() -> Self {
        let mut base = NodeBase::new();
        base.set_numbered_output_pins(0, 1);
        Self { base }
    }

    /// Create a sequence with `count` outputs
    pub fn with_outputs(count: u8) -> Self {
        let mut node = Self::new();
        node.set_output_count(count);
        node
    }

    /// Replace the outputs with `count` numbered pins, at least one
    pub fn set_output_count(&mut self, count: u8) {
        self.base.set_numbered_output_pins(0, count.max(1) - 1);
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowNode for Sequence {
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
        let outputs: Vec<String> = self
            .base
            .output_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let Some((last, rest)) = outputs.split_last() else {
            self.finish(cx);
            return;
        };

        for pin_name in rest {
            self.trigger_output(cx, pin_name, false);
        }
        self.trigger_output(cx, last, true);
    }

    fn apply_property(&mut self, name: &str, value: &str) -> Result<bool> {
        if name != "outputs" {
            return Ok(false);
        }
        let count = value
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|count| *count > 0)
            .ok_or_else(|| FlowError::InvalidProperty {
                name: name.to_string(),
                value: value.to_string(),
            })?;
        self.set_output_count(count);
        Ok(true)
    }
}
