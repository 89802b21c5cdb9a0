// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the flow runtime.
//!
//! A node type embeds a [`NodeBase`] holding everything the activation engine
//! needs (pins, connections, state, records, add-ons) and implements
//! [`FlowNode`] to supply its own logic through lifecycle hooks.

use crate::addon::NodeAddOn;
use crate::connection::Connections;
use crate::context::FlowContext;
use crate::engine::NodeEngine;
use crate::error::{FlowError, Result};
use crate::pin::{
    is_numeric_name, numbered_pins, pin_index, Pin, PinDirection, PinRecord, DEFAULT_INPUT_PIN,
    DEFAULT_OUTPUT_PIN,
};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for NodeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle stage of a node instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActivationState {
    /// Initial state, also restored by a reset
    #[default]
    NeverActivated,
    /// Received input while enabled and has not finished
    Active,
    /// Finished under the `Complete` finish policy
    Completed,
    /// Finished under the `Abort` finish policy
    Aborted,
}

impl ActivationState {
    /// Whether the node has finished
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

/// How a node treats inbound signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignalMode {
    /// Normal execution
    #[default]
    Enabled,
    /// Inbound signals are dropped
    Disabled,
    /// Inbound signals skip node logic and go straight to connected outputs
    PassThrough,
}

impl SignalMode {
    /// Every signal mode
    pub fn all() -> &'static [SignalMode] {
        &[Self::Enabled, Self::Disabled, Self::PassThrough]
    }
}

/// Runtime state shared by every node type
pub struct NodeBase {
    id: NodeId,
    input_pins: Vec<Pin>,
    output_pins: Vec<Pin>,
    connections: Connections,
    allowed_signal_modes: Vec<SignalMode>,
    signal_mode: SignalMode,
    pub(crate) activation_state: ActivationState,
    pub(crate) activated_time: f64,
    pub(crate) preloaded: bool,
    input_records: IndexMap<String, Vec<PinRecord>>,
    output_records: IndexMap<String, Vec<PinRecord>>,
    add_ons: Vec<Box<dyn NodeAddOn>>,
}

impl NodeBase {
    /// Create a base with the default `In`/`Out` pins and every signal mode allowed
    pub fn new() -> Self {
        Self {
            id: NodeId::new(),
            input_pins: vec![Pin::new(DEFAULT_INPUT_PIN)],
            output_pins: vec![Pin::new(DEFAULT_OUTPUT_PIN)],
            connections: Connections::new(),
            allowed_signal_modes: SignalMode::all().to_vec(),
            signal_mode: SignalMode::Enabled,
            activation_state: ActivationState::NeverActivated,
            activated_time: 0.0,
            preloaded: false,
            input_records: IndexMap::new(),
            output_records: IndexMap::new(),
            add_ons: Vec::new(),
        }
    }

    /// Use a specific ID
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    /// Replace the input pins
    pub fn with_inputs<P: Into<Pin>>(mut self, pins: impl IntoIterator<Item = P>) -> Self {
        self.input_pins = pins.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the output pins
    pub fn with_outputs<P: Into<Pin>>(mut self, pins: impl IntoIterator<Item = P>) -> Self {
        self.output_pins = pins.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the signal modes this node accepts
    ///
    /// `Enabled` is always kept so the node can run.
    pub fn with_allowed_signal_modes(mut self, modes: &[SignalMode]) -> Self {
        self.allowed_signal_modes = modes.to_vec();
        if !self.allowed_signal_modes.contains(&SignalMode::Enabled) {
            self.allowed_signal_modes.insert(0, SignalMode::Enabled);
        }
        self
    }

    /// Attach an add-on
    pub fn with_add_on(mut self, add_on: impl NodeAddOn + 'static) -> Self {
        self.add_ons.push(Box::new(add_on));
        self
    }

    /// Node ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: NodeId) {
        self.id = id;
    }

    /// Current activation state
    pub fn activation_state(&self) -> ActivationState {
        self.activation_state
    }

    /// Time of the last activation, read from the graph's time source
    pub fn activated_time(&self) -> f64 {
        self.activated_time
    }

    /// Whether content was preloaded and not flushed since
    pub fn is_preloaded(&self) -> bool {
        self.preloaded
    }

    /// Current signal mode
    pub fn signal_mode(&self) -> SignalMode {
        self.signal_mode
    }

    /// Signal modes this node accepts
    pub fn allowed_signal_modes(&self) -> &[SignalMode] {
        &self.allowed_signal_modes
    }

    /// Whether the node accepts a signal mode
    pub fn supports_signal_mode(&self, mode: SignalMode) -> bool {
        self.allowed_signal_modes.contains(&mode)
    }

    /// Change the signal mode
    ///
    /// An unsupported mode is logged and leaves the current mode untouched.
    pub fn set_signal_mode(&mut self, mode: SignalMode) -> Result<()> {
        if !self.supports_signal_mode(mode) {
            tracing::error!(node = %self.id, ?mode, "Signal mode not supported by node");
            return Err(FlowError::UnsupportedSignalMode {
                node_id: self.id,
                mode,
            });
        }
        self.signal_mode = mode;
        Ok(())
    }

    /// Outbound connections
    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    /// Mutable outbound connections
    pub fn connections_mut(&mut self) -> &mut Connections {
        &mut self.connections
    }

    /// Attached add-ons
    pub fn add_ons(&self) -> &[Box<dyn NodeAddOn>] {
        &self.add_ons
    }

    /// Mutable attached add-ons
    pub fn add_ons_mut(&mut self) -> &mut [Box<dyn NodeAddOn>] {
        &mut self.add_ons
    }

    /// Attach an add-on
    pub fn add_add_on(&mut self, add_on: Box<dyn NodeAddOn>) {
        self.add_ons.push(add_on);
    }

    /// Whether any add-on derives pins from runtime context
    pub fn supports_context_pins(&self) -> bool {
        self.add_ons.iter().any(|add_on| add_on.supports_context_pins())
    }

    // Pins

    /// The node's own input pins
    pub fn input_pins(&self) -> &[Pin] {
        &self.input_pins
    }

    /// The node's own output pins
    pub fn output_pins(&self) -> &[Pin] {
        &self.output_pins
    }

    /// Append input pins; callers keep names unique
    pub fn add_input_pins<P: Into<Pin>>(&mut self, pins: impl IntoIterator<Item = P>) {
        self.input_pins.extend(pins.into_iter().map(Into::into));
    }

    /// Append output pins; callers keep names unique
    pub fn add_output_pins<P: Into<Pin>>(&mut self, pins: impl IntoIterator<Item = P>) {
        self.output_pins.extend(pins.into_iter().map(Into::into));
    }

    /// Replace the input pins with pins named `first..=last`
    pub fn set_numbered_input_pins(&mut self, first: u8, last: u8) {
        self.input_pins = numbered_pins(first, last);
    }

    /// Replace the output pins with pins named `first..=last`
    pub fn set_numbered_output_pins(&mut self, first: u8, last: u8) {
        self.output_pins = numbered_pins(first, last);
    }

    /// Number of input pins with numeric names
    pub fn count_numbered_inputs(&self) -> usize {
        self.input_pins.iter().filter(|pin| pin.is_numbered()).count()
    }

    /// Number of output pins with numeric names
    pub fn count_numbered_outputs(&self) -> usize {
        self.output_pins.iter().filter(|pin| pin.is_numbered()).count()
    }

    /// Names of the input pins, skipping unnamed ones
    pub fn input_names(&self) -> Vec<&str> {
        pin_names(&self.input_pins)
    }

    /// Names of the output pins, skipping unnamed ones
    pub fn output_names(&self) -> Vec<&str> {
        pin_names(&self.output_pins)
    }

    /// Remove an input pin, renumbering the numeric pins after it
    pub fn remove_user_input(&mut self, pin_name: &str) -> bool {
        remove_and_renumber(&mut self.input_pins, pin_name)
    }

    /// Remove an output pin, renumbering the numeric pins after it
    pub fn remove_user_output(&mut self, pin_name: &str) -> bool {
        remove_and_renumber(&mut self.output_pins, pin_name)
    }

    /// Replace the input pins by name, returning whether anything changed
    ///
    /// An empty list restores the default `In` pin.
    pub fn rebuild_input_pins(&mut self, names: &[&str]) -> bool {
        rebuild_pins(&mut self.input_pins, names, DEFAULT_INPUT_PIN)
    }

    /// Replace the output pins by name, returning whether anything changed
    ///
    /// An empty list restores the default `Out` pin.
    pub fn rebuild_output_pins(&mut self, names: &[&str]) -> bool {
        rebuild_pins(&mut self.output_pins, names, DEFAULT_OUTPUT_PIN)
    }

    /// Index of an input pin, counting add-on pins after the node's own
    pub fn input_pin_index(&self, pin_name: &str) -> Option<usize> {
        resolve_pin(&self.input_pins, &self.add_ons, pin_name, PinDirection::Input)
    }

    /// Index of an output pin, counting add-on pins after the node's own
    pub fn output_pin_index(&self, pin_name: &str) -> Option<usize> {
        resolve_pin(&self.output_pins, &self.add_ons, pin_name, PinDirection::Output)
    }

    /// Whether the node or one of its add-ons has this input pin
    pub fn has_input_pin(&self, pin_name: &str) -> bool {
        self.input_pin_index(pin_name).is_some()
    }

    /// Whether the node or one of its add-ons has this output pin
    pub fn has_output_pin(&self, pin_name: &str) -> bool {
        self.output_pin_index(pin_name).is_some()
    }

    /// Whether the node itself declares an input pin
    ///
    /// Without add-ons every pin the node sees must be its own, so this
    /// asserts in debug builds and answers `true`. With add-ons, pins the
    /// node does not declare belong to an add-on and are not supported here.
    pub fn is_supported_input_pin_name(&self, pin_name: &str) -> bool {
        if self.add_ons.is_empty() {
            debug_assert!(
                pin_index(&self.input_pins, pin_name).is_some(),
                "only add-ons may introduce unknown pins, node {} has none but saw {pin_name}",
                self.id
            );
            return true;
        }
        pin_index(&self.input_pins, pin_name).is_some()
    }

    /// Whether an output pin exists and is wired
    pub fn is_output_connected(&self, pin_name: &str) -> bool {
        pin_index(&self.output_pins, pin_name).is_some() && self.connections.contains(pin_name)
    }

    /// Distinct nodes this node is wired to
    pub fn connected_node_ids(&self) -> IndexSet<NodeId> {
        self.connections.connected_node_ids()
    }

    /// Output pin wired to another node
    pub fn pin_connected_to_node(&self, node_id: NodeId) -> Option<&str> {
        self.connections.pin_connected_to_node(node_id)
    }

    // Records

    /// Activation log of a pin
    pub fn pin_records(&self, pin_name: &str, direction: PinDirection) -> &[PinRecord] {
        let records = match direction {
            PinDirection::Input => &self.input_records,
            PinDirection::Output => &self.output_records,
        };
        records.get(pin_name).map_or(&[], Vec::as_slice)
    }

    /// Last record of every triggered output, keyed by output pin index
    pub fn wire_records(&self) -> IndexMap<usize, PinRecord> {
        self.output_records
            .iter()
            .filter_map(|(name, records)| {
                let index = self.output_pin_index(name)?;
                records.last().map(|record| (index, *record))
            })
            .collect()
    }

    /// Whether any pin has recorded activations
    pub fn has_records(&self) -> bool {
        !self.input_records.is_empty() || !self.output_records.is_empty()
    }

    pub(crate) fn record_input(&mut self, pin_name: &str, record: PinRecord) {
        self.input_records
            .entry(pin_name.to_string())
            .or_default()
            .push(record);
    }

    pub(crate) fn record_output(&mut self, pin_name: &str, record: PinRecord) {
        self.output_records
            .entry(pin_name.to_string())
            .or_default()
            .push(record);
    }

    pub(crate) fn clear_records(&mut self) {
        self.input_records.clear();
        self.output_records.clear();
    }

    /// Elapsed active time for status displays, empty unless active
    pub fn status_string(&self, now: f64) -> String {
        if self.activation_state == ActivationState::Active {
            format!("{:.1}s", now - self.activated_time)
        } else {
            String::new()
        }
    }
}

impl Default for NodeBase {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeBase")
            .field("id", &self.id)
            .field("input_pins", &self.input_pins)
            .field("output_pins", &self.output_pins)
            .field("connections", &self.connections)
            .field("signal_mode", &self.signal_mode)
            .field("activation_state", &self.activation_state)
            .field(
                "add_ons",
                &self.add_ons.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

fn pin_names(pins: &[Pin]) -> Vec<&str> {
    pins.iter()
        .filter(|pin| !pin.is_none())
        .map(|pin| pin.name.as_str())
        .collect()
}

fn resolve_pin(
    own: &[Pin],
    add_ons: &[Box<dyn NodeAddOn>],
    pin_name: &str,
    direction: PinDirection,
) -> Option<usize> {
    if let Some(index) = pin_index(own, pin_name) {
        return Some(index);
    }
    let mut offset = own.len();
    for add_on in add_ons {
        let pins = match direction {
            PinDirection::Input => add_on.input_pins(),
            PinDirection::Output => add_on.output_pins(),
        };
        if let Some(index) = pin_index(pins, pin_name) {
            return Some(offset + index);
        }
        offset += pins.len();
    }
    None
}

fn remove_and_renumber(pins: &mut Vec<Pin>, pin_name: &str) -> bool {
    let Some(removed) = pin_index(pins, pin_name) else {
        return false;
    };
    pins.remove(removed);
    for (index, pin) in pins.iter_mut().enumerate().skip(removed) {
        if is_numeric_name(&pin.name) {
            pin.name = index.to_string();
        }
    }
    true
}

fn rebuild_pins(pins: &mut Vec<Pin>, names: &[&str], default_pin: &str) -> bool {
    let new_pins: Vec<Pin> = if names.is_empty() {
        vec![Pin::new(default_pin)]
    } else {
        names.iter().map(|name| Pin::new(*name)).collect()
    };

    let changed = new_pins.len() != pins.len()
        || new_pins.iter().zip(pins.iter()).any(|(new, old)| new.name != old.name);
    if changed {
        *pins = new_pins;
    }
    changed
}

/// Format a progress value with two decimals
pub fn progress_as_string(value: f32) -> String {
    format!("{value:.2}")
}

/// A node type: its own state plus lifecycle hooks.
///
/// Hooks are invoked by the activation engine ([`NodeEngine`]); node logic
/// calls back into the engine (`trigger_output`, `finish`) to move signals on.
pub trait FlowNode: Any {
    /// Shared runtime state
    fn base(&self) -> &NodeBase;

    /// Mutable shared runtime state
    fn base_mut(&mut self) -> &mut NodeBase;

    /// Upcast for typed lookups
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed lookups
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Class name used by registries and logs
    fn class_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called once per activation period, before the first input executes
    fn on_activate(&mut self, _cx: &mut dyn FlowContext) {}

    /// Node logic for an input pin, only called while enabled
    fn execute_input(&mut self, _cx: &mut dyn FlowContext, _pin_name: &str) {}

    /// Called instead of `execute_input` in pass-through mode
    fn on_pass_through(&mut self, cx: &mut dyn FlowContext) {
        self.pass_through(cx);
    }

    /// Release whatever the node logic acquired
    fn cleanup(&mut self, _cx: &mut dyn FlowContext) {}

    /// Called before the node state is written to save data
    fn on_save(&mut self) {}

    /// Called after an enabled node was restored from save data
    fn on_load(&mut self, _cx: &mut dyn FlowContext) {}

    /// Node-specific fields to persist
    fn save_state(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    /// Restore the fields written by `save_state`
    fn load_state(&mut self, _data: &[u8]) -> Result<()> {
        Ok(())
    }

    /// Load content ahead of activation
    fn preload_content(&mut self) {}

    /// Drop preloaded content
    fn flush_content(&mut self) {}

    /// Apply an authored property, returning whether the name is known
    fn apply_property(&mut self, _name: &str, _value: &str) -> Result<bool> {
        Ok(false)
    }
}

impl<'a> dyn FlowNode + 'a {
    /// Whether the node has concrete type `T`
    pub fn is<T: FlowNode>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Downcast to a concrete node type
    pub fn downcast_ref<T: FlowNode>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutably downcast to a concrete node type
    pub fn downcast_mut<T: FlowNode>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addon::PinAddOn;
    use crate::connection::ConnectedPin;

    #[test]
    fn test_default_pins() {
        let base = NodeBase::new();
        assert_eq!(base.input_names(), ["In"]);
        assert_eq!(base.output_names(), ["Out"]);
        assert_eq!(base.activation_state(), ActivationState::NeverActivated);
        assert_eq!(base.signal_mode(), SignalMode::Enabled);
    }

    #[test]
    fn test_numbered_input_pins_replace_existing() {
        let mut base = NodeBase::new().with_inputs(["In", "Reset"]);
        base.set_numbered_input_pins(0, 2);
        assert_eq!(base.input_names(), ["0", "1", "2"]);
        assert_eq!(base.count_numbered_inputs(), 3);
    }

    #[test]
    fn test_add_pins_keeps_duplicates() {
        let mut base = NodeBase::new();
        base.add_output_pins(["Out", "Done"]);
        assert_eq!(base.output_names(), ["Out", "Out", "Done"]);
    }

    #[test]
    fn test_remove_user_output_renumbers() {
        let mut base = NodeBase::new();
        base.set_numbered_output_pins(0, 3);
        base.add_output_pins(["Done"]);

        assert!(base.remove_user_output("1"));
        assert_eq!(base.output_names(), ["0", "1", "2", "Done"]);
        assert!(!base.remove_user_output("7"));
    }

    #[test]
    fn test_rebuild_pins() {
        let mut base = NodeBase::new();
        assert!(!base.rebuild_input_pins(&["In"]));
        assert!(base.rebuild_input_pins(&["A", "B"]));
        assert_eq!(base.input_names(), ["A", "B"]);
        assert!(base.rebuild_input_pins(&[]));
        assert_eq!(base.input_names(), ["In"]);
    }

    #[test]
    fn test_unsupported_signal_mode() {
        let mut base = NodeBase::new().with_allowed_signal_modes(&[SignalMode::Disabled]);
        assert!(base.supports_signal_mode(SignalMode::Enabled));
        assert!(base.set_signal_mode(SignalMode::PassThrough).is_err());
        assert_eq!(base.signal_mode(), SignalMode::Enabled);
        assert!(base.set_signal_mode(SignalMode::Disabled).is_ok());
        assert_eq!(base.signal_mode(), SignalMode::Disabled);
    }

    #[test]
    fn test_add_on_pins_resolve_after_own() {
        let base = NodeBase::new()
            .with_add_on(
                PinAddOn::new("Extra")
                    .with_inputs(["Cancel"])
                    .with_outputs(["Cancelled"]),
            );

        assert_eq!(base.input_pin_index("In"), Some(0));
        assert_eq!(base.input_pin_index("Cancel"), Some(1));
        assert_eq!(base.output_pin_index("Cancelled"), Some(1));
        assert!(base.has_input_pin("Cancel"));
        assert!(!base.is_supported_input_pin_name("Cancel"));
        assert!(base.is_supported_input_pin_name("In"));
    }

    #[test]
    fn test_output_connected_requires_pin() {
        let target = NodeId::new();
        let mut base = NodeBase::new();
        base.connections_mut().insert("Out", ConnectedPin::new(target, "In"));
        base.connections_mut().insert("Stale", ConnectedPin::new(target, "In"));

        assert!(base.is_output_connected("Out"));
        assert!(!base.is_output_connected("Stale"));
        assert_eq!(base.pin_connected_to_node(target), Some("Out"));
    }

    #[test]
    fn test_status_string() {
        let mut base = NodeBase::new();
        assert!(base.status_string(5.0).is_empty());
        base.activation_state = ActivationState::Active;
        base.activated_time = 1.0;
        assert_eq!(base.status_string(3.5), "2.5s");
        assert_eq!(progress_as_string(0.5), "0.50");
    }

    #[test]
    fn test_node_id_parse() {
        let id = NodeId::new();
        let parsed: NodeId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<NodeId>().is_err());
    }
}
