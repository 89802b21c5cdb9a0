// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of node classes that assets can instantiate.

use crate::error::{FlowError, Result};
use crate::node::FlowNode;
use indexmap::IndexMap;

/// Creates a fresh node of one class
pub type NodeFactory = fn() -> Box<dyn FlowNode>;

/// A registered node class
#[derive(Debug, Clone)]
pub struct NodeClass {
    /// Class ID referenced by assets
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Factory
    pub factory: NodeFactory,
}

/// Registry of available node classes
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    classes: IndexMap<String, NodeClass>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in nodes
    pub fn with_builtin_nodes() -> Self {
        let mut registry = Self::new();
        crate::nodes::register_builtin_nodes(&mut registry);
        registry
    }

    /// Register a node class, replacing any class with the same ID
    pub fn register(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        factory: NodeFactory,
    ) {
        let id = id.into();
        let class = NodeClass {
            id: id.clone(),
            name: name.into(),
            description: description.into(),
            factory,
        };
        if self.classes.insert(id.clone(), class).is_some() {
            tracing::warn!(class = %id, "Node class registered twice, keeping the latest");
        }
    }

    /// Get a node class by ID
    pub fn get(&self, id: &str) -> Option<&NodeClass> {
        self.classes.get(id)
    }

    /// Get all registered classes
    pub fn classes(&self) -> impl Iterator<Item = &NodeClass> {
        self.classes.values()
    }

    /// Create a node from a class ID
    pub fn create_node(&self, id: &str) -> Result<Box<dyn FlowNode>> {
        self.get(id)
            .map(|class| (class.factory)())
            .ok_or_else(|| FlowError::UnknownNodeClass(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Counter, Reroute};

    #[test]
    fn test_builtin_nodes() {
        let registry = NodeRegistry::with_builtin_nodes();
        let ids: Vec<&str> = registry.classes().map(|class| class.id.as_str()).collect();
        assert_eq!(ids, ["Reroute", "Sequence", "Counter", "LogMessage"]);

        let node = registry.create_node(Counter::CLASS).unwrap();
        assert!(node.is::<Counter>());
        assert_eq!(node.class_name(), "Counter");
    }

    #[test]
    fn test_unknown_class() {
        let registry = NodeRegistry::new();
        assert!(matches!(
            registry.create_node("Missing"),
            Err(FlowError::UnknownNodeClass(class)) if class == "Missing"
        ));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = NodeRegistry::with_builtin_nodes();
        registry.register(Reroute::CLASS, "Knot", "", || Box::new(Reroute::new()));
        assert_eq!(registry.classes().count(), 4);
        assert_eq!(registry.get(Reroute::CLASS).unwrap().name, "Knot");
    }
}
