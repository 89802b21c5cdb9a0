// SPDX-License-Identifier: MIT OR Apache-2.0
//! Log message node.

use crate::context::FlowContext;
use crate::engine::NodeEngine;
use crate::error::Result;
use crate::node::{FlowNode, NodeBase};
use std::any::Any;

/// Writes its message to the log, then forwards and finishes
#[derive(Debug, Default)]
pub struct LogMessage {
    base: NodeBase,
    message: String,
    emitted: usize,
}

impl LogMessage {
    /// Registry class ID
    pub const CLASS: &'static str = "LogMessage";

    /// Create a node with an empty message
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Message written on every signal
    pub fn message(&self) -> &str {
        &self.message
    }

    /// How many times the message was written
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

impl FlowNode for LogMessage {
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
        tracing::info!(node = %self.base.id(), "{}", self.message);
        self.emitted += 1;
        self.trigger_first_output(cx, true);
    }

    fn apply_property(&mut self, name: &str, value: &str) -> Result<bool> {
        if name != "message" {
            return Ok(false);
        }
        self.message = value.to_string();
        Ok(true)
    }
}
