// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node types.

pub mod counter;
pub mod log_message;
pub mod reroute;
pub mod sequence;

use crate::registry::NodeRegistry;

pub use counter::Counter;
pub use log_message::LogMessage;
pub use reroute::Reroute;
pub use sequence::Sequence;

/// Register every built-in node type
pub fn register_builtin_nodes(registry: &mut NodeRegistry) {
    registry.register(
        Reroute::CLASS,
        "Reroute",
        "Forwards its input to its output",
        || Box::new(Reroute::new()),
    );
    registry.register(
        Sequence::CLASS,
        "Sequence",
        "Fires every numbered output in order",
        || Box::new(Sequence::new()),
    );
    registry.register(
        Counter::CLASS,
        "Counter",
        "Counts signals until a goal is reached",
        || Box::new(Counter::new()),
    );
    registry.register(
        LogMessage::CLASS,
        "Log Message",
        "Writes a message to the log",
        || Box::new(LogMessage::new()),
    );
}
