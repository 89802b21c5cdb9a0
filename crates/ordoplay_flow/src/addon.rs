// SPDX-License-Identifier: MIT OR Apache-2.0
//! Add-ons: capability objects attached to a node.
//!
//! A node owns its add-ons as a list. Pin lookups check the node's own pins
//! first and then each add-on in attachment order, which is the only
//! legitimate way for a node to see pins missing from its own lists.

use crate::pin::Pin;

/// Auxiliary behavior attached to a node
pub trait NodeAddOn {
    /// Display name
    fn name(&self) -> &str;

    /// Extra input pins contributed to the owning node
    fn input_pins(&self) -> &[Pin] {
        &[]
    }

    /// Extra output pins contributed to the owning node
    fn output_pins(&self) -> &[Pin] {
        &[]
    }

    /// Whether the add-on derives pins from runtime context
    fn supports_context_pins(&self) -> bool {
        false
    }

    /// Called when the owning node becomes active
    fn on_activate(&mut self) {}

    /// Called when the owning node is deactivated
    fn cleanup(&mut self) {}
}

/// Add-on that contributes a fixed set of pins
#[derive(Debug, Clone, Default)]
pub struct PinAddOn {
    name: String,
    inputs: Vec<Pin>,
    outputs: Vec<Pin>,
    context_pins: bool,
}

impl PinAddOn {
    /// Create an add-on without pins
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add input pins
    pub fn with_inputs<P: Into<Pin>>(mut self, pins: impl IntoIterator<Item = P>) -> Self {
        self.inputs.extend(pins.into_iter().map(Into::into));
        self
    }

    /// Add output pins
    pub fn with_outputs<P: Into<Pin>>(mut self, pins: impl IntoIterator<Item = P>) -> Self {
        self.outputs.extend(pins.into_iter().map(Into::into));
        self
    }

    /// Mark the pins as context-derived
    pub fn with_context_pins(mut self) -> Self {
        self.context_pins = true;
        self
    }
}

impl NodeAddOn for PinAddOn {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_pins(&self) -> &[Pin] {
        &self.inputs
    }

    fn output_pins(&self) -> &[Pin] {
        &self.outputs
    }

    fn supports_context_pins(&self) -> bool {
        self.context_pins
    }
}
