// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pin definitions for node inputs/outputs.

use serde::{Deserialize, Serialize};

/// Name of the input pin every node starts with
pub const DEFAULT_INPUT_PIN: &str = "In";

/// Name of the output pin every node starts with
pub const DEFAULT_OUTPUT_PIN: &str = "Out";

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinDirection {
    /// Input pin
    Input,
    /// Output pin
    Output,
}

/// A named connection point on a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pin {
    /// Pin name, unique among the pins of one direction on a node
    pub name: String,
    /// Tooltip shown by tooling
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tooltip: String,
}

impl Pin {
    /// Create a new pin
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tooltip: String::new(),
        }
    }

    /// Create a pin named after a number
    pub fn numbered(number: u8) -> Self {
        Self::new(number.to_string())
    }

    /// Set the tooltip
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = tooltip.into();
        self
    }

    /// Whether this pin carries the empty ("none") name
    pub fn is_none(&self) -> bool {
        self.name.is_empty()
    }

    /// Whether the pin name is a plain number
    pub fn is_numbered(&self) -> bool {
        is_numeric_name(&self.name)
    }
}

impl From<&str> for Pin {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Pin {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<u8> for Pin {
    fn from(number: u8) -> Self {
        Self::numbered(number)
    }
}

/// How a pin got activated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PinActivationType {
    /// Regular signal propagation
    #[default]
    Default,
    /// Triggered by hand, e.g. from a debugger
    Forced,
    /// Re-broadcast by a node in pass-through mode
    PassThrough,
}

/// Single entry in a pin's activation log
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinRecord {
    /// Time read from the time source when the pin fired
    pub time: f64,
    /// How the pin was activated
    pub activation_type: PinActivationType,
}

impl PinRecord {
    /// Create a new record
    pub fn new(time: f64, activation_type: PinActivationType) -> Self {
        Self {
            time,
            activation_type,
        }
    }
}

/// Pins named `first..=last`, empty when `first > last`
pub fn numbered_pins(first: u8, last: u8) -> Vec<Pin> {
    (first..=last).map(Pin::numbered).collect()
}

/// Position of the pin called `name`
pub(crate) fn pin_index(pins: &[Pin], name: &str) -> Option<usize> {
    pins.iter().position(|pin| pin.name == name)
}

pub(crate) fn is_numeric_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}
