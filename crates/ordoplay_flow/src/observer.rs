// SPDX-License-Identifier: MIT OR Apache-2.0
//! Traversal observers for graph visualization and debugging.

use crate::node::NodeId;
use std::cell::RefCell;
use std::rc::Rc;

/// Receives pin traversal notifications
///
/// Notifications are fire-and-forget: observers cannot fail or influence
/// propagation.
pub trait GraphObserver {
    /// An input pin was triggered
    fn on_input_triggered(&mut self, node_id: NodeId, pin_index: usize);

    /// An output pin was triggered
    fn on_output_triggered(&mut self, node_id: NodeId, pin_index: usize);
}

/// One observed pin traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalEvent {
    /// Input pin triggered
    Input {
        /// Node that received the signal
        node_id: NodeId,
        /// Index of the pin
        pin_index: usize,
    },
    /// Output pin triggered
    Output {
        /// Node that sent the signal
        node_id: NodeId,
        /// Index of the pin
        pin_index: usize,
    },
}

impl TraversalEvent {
    /// Node involved in the event
    pub fn node_id(&self) -> NodeId {
        match self {
            Self::Input { node_id, .. } | Self::Output { node_id, .. } => *node_id,
        }
    }
}

/// Observer keeping every event in order
///
/// Clones share the log, so a handle stays readable after the observer is
/// given to a graph.
#[derive(Debug, Clone, Default)]
pub struct TraversalLog {
    events: Rc<RefCell<Vec<TraversalEvent>>>,
}

impl TraversalLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<TraversalEvent> {
        self.events.borrow().clone()
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Forget recorded events
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl GraphObserver for TraversalLog {
    fn on_input_triggered(&mut self, node_id: NodeId, pin_index: usize) {
        self.events
            .borrow_mut()
            .push(TraversalEvent::Input { node_id, pin_index });
    }

    fn on_output_triggered(&mut self, node_id: NodeId, pin_index: usize) {
        self.events
            .borrow_mut()
            .push(TraversalEvent::Output { node_id, pin_index });
    }
}
