// SPDX-License-Identifier: MIT OR Apache-2.0
//! Counter node: counts signals until a goal is reached.

use crate::context::FlowContext;
use crate::engine::NodeEngine;
use crate::error::{FlowError, Result};
use crate::node::{FlowNode, NodeBase};
use crate::persistence::{decode_state, encode_state};
use std::any::Any;

/// Counts `In` signals, firing `Step` until `goal` is reached and `Goal` then
#[derive(Debug)]
pub struct Counter {
    base: NodeBase,
    goal: u32,
    count: u32,
}

impl Counter {
    /// Registry class ID
    pub const CLASS: &'static str = "Counter";

    /// Input that counts one step
    pub const IN: &'static str = "In";
    /// Input that clears the count
    pub const RESET: &'static str = "Reset";
    /// Output fired for every step below the goal
    pub const STEP: &'static str = "Step";
    /// Output fired when the goal is reached
    pub const GOAL: &'static str = "Goal";

    /// Create a counter with a goal of 1
    pub fn new() -> Self {
        Self::with_goal(1)
    }

    /// Create a counter with the given goal
    pub fn with_goal(goal: u32) -> Self {
        let base = NodeBase::new()
            .with_inputs([Self::IN, Self::RESET])
            .with_outputs([Self::STEP, Self::GOAL]);
        Self {
            base,
            goal: goal.max(1),
            count: 0,
        }
    }

    /// Signals counted since the last reset
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Signals needed to fire `Goal`
    pub fn goal(&self) -> u32 {
        self.goal
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowNode for Counter {
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

    fn execute_input(&mut self, cx: &mut dyn FlowContext, pin_name: &str) {
        if pin_name == Self::RESET {
            self.count = 0;
            return;
        }

        self.count += 1;
        if self.count >= self.goal {
            self.trigger_output(cx, Self::GOAL, true);
        } else {
            self.trigger_output(cx, Self::STEP, false);
        }
    }

    fn cleanup(&mut self, _cx: &mut dyn FlowContext) {
        self.count = 0;
    }

    fn save_state(&self) -> Result<Vec<u8>> {
        encode_state(&self.count)
    }

    fn load_state(&mut self, data: &[u8]) -> Result<()> {
        let count: u32 = decode_state(data)?;
        if count > self.goal {
            return Err(FlowError::InvalidNodeState {
                node_id: self.base.id(),
                reason: format!("count {count} is past goal {}", self.goal),
            });
        }
        self.count = count;
        Ok(())
    }

    fn apply_property(&mut self, name: &str, value: &str) -> Result<bool> {
        if name != "goal" {
            return Ok(false);
        }
        self.goal = value
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|goal| *goal > 0)
            .ok_or_else(|| FlowError::InvalidProperty {
                name: name.to_string(),
                value: value.to_string(),
            })?;
        Ok(true)
    }
}
