//! Component Registry - Runtime records of mounted component instances.
//!
//! Manages the lifecycle of component instances:
//! - Monotonic instance id generation (ids are never reused)
//! - Instance -> live node and node -> instance mapping, kept out of band
//! - Per-instance binding tables and the reverse node -> binding index

use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::primitives::{Component, Producer};
use crate::types::{InstanceId, Key, NodeId};

/// Shared, type-erased component state.
pub(crate) type StateCell = Rc<RefCell<Box<dyn Any>>>;

// =============================================================================
// Runtime Record
// =============================================================================

/// Runtime record of one mounted component.
pub(crate) struct Instance {
    /// Current root node. `None` only while a keyed move is recreating it.
    pub node: Option<NodeId>,
    pub state: StateCell,
    /// Rebound whenever the parent re-renders with fresh component data.
    pub producer: Producer,
    pub key: Option<Key>,
    pub binding: Option<String>,
    /// Binding name -> bound descendant node.
    pub bindings: BTreeMap<String, NodeId>,
    pub renders: u64,
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Default)]
pub(crate) struct Registry {
    next_id: u64,
    instances: HashMap<InstanceId, Instance>,
    by_node: HashMap<NodeId, InstanceId>,
    bound: HashMap<NodeId, (InstanceId, String)>,
}

impl Registry {
    /// Store a new record. The node is attached separately once built.
    pub fn allocate(&mut self, component: &Component, state: Box<dyn Any>) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        self.instances.insert(
            id,
            Instance {
                node: None,
                state: Rc::new(RefCell::new(state)),
                producer: component.render.clone(),
                key: component.key.clone(),
                binding: component.binding.clone(),
                bindings: BTreeMap::new(),
                renders: 0,
            },
        );
        id
    }

    /// Point an instance at its (new) root node.
    pub fn attach(&mut self, id: InstanceId, node: NodeId) {
        let Some(instance) = self.instances.get_mut(&id) else {
            return;
        };
        if let Some(previous) = instance.node.replace(node) {
            if self.by_node.get(&previous) == Some(&id) {
                self.by_node.remove(&previous);
            }
        }
        self.by_node.insert(node, id);
    }

    /// Forget an instance's root node while keeping the record.
    pub fn detach_node(&mut self, id: InstanceId) {
        if let Some(previous) = self.instances.get_mut(&id).and_then(|i| i.node.take()) {
            self.by_node.remove(&previous);
        }
    }

    /// Swap in fresh component data, keeping state and bindings.
    pub fn rebind(&mut self, id: InstanceId, component: &Component) {
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.producer = component.render.clone();
            instance.key = component.key.clone();
            instance.binding = component.binding.clone();
        }
    }

    /// Remove a record and every index entry pointing at it.
    pub fn release(&mut self, id: InstanceId) -> Option<Instance> {
        let instance = self.instances.remove(&id)?;
        if let Some(node) = instance.node {
            if self.by_node.get(&node) == Some(&id) {
                self.by_node.remove(&node);
            }
        }
        for node in instance.bindings.values() {
            if self.bound.get(node).is_some_and(|(owner, _)| *owner == id) {
                self.bound.remove(node);
            }
        }
        Some(instance)
    }

    pub fn note_render(&mut self, id: InstanceId) {
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.renders += 1;
        }
    }

    // =========================================================================
    // Bindings
    // =========================================================================

    /// Register `node` under `name` in `owner`'s binding table.
    pub fn set_binding(&mut self, owner: InstanceId, name: &str, node: NodeId) {
        if !self.instances.contains_key(&owner) {
            return;
        }
        if let Some((prev_owner, prev_name)) = self.bound.get(&node).cloned() {
            if prev_owner != owner || prev_name != name {
                self.remove_table_entry(prev_owner, &prev_name, node);
            }
        }
        let previous = self
            .instances
            .get_mut(&owner)
            .and_then(|i| i.bindings.insert(name.to_string(), node));
        if let Some(previous) = previous.filter(|&p| p != node) {
            if self
                .bound
                .get(&previous)
                .is_some_and(|(o, n)| *o == owner && n == name)
            {
                self.bound.remove(&previous);
            }
        }
        self.bound.insert(node, (owner, name.to_string()));
    }

    /// Drop whatever binding points at `node`.
    pub fn unbind_node(&mut self, node: NodeId) {
        if let Some((owner, name)) = self.bound.remove(&node) {
            self.remove_table_entry(owner, &name, node);
        }
    }

    /// Drop the binding at `node` only if `owner` holds it.
    pub fn unbind_node_of(&mut self, owner: InstanceId, node: NodeId) {
        if self.bound.get(&node).is_some_and(|(o, _)| *o == owner) {
            self.unbind_node(node);
        }
    }

    fn remove_table_entry(&mut self, owner: InstanceId, name: &str, node: NodeId) {
        if let Some(instance) = self.instances.get_mut(&owner) {
            if instance.bindings.get(name) == Some(&node) {
                instance.bindings.remove(name);
            }
        }
    }

    pub fn binding(&self, owner: InstanceId, name: &str) -> Option<NodeId> {
        self.instances.get(&owner)?.bindings.get(name).copied()
    }

    pub fn bound_at(&self, node: NodeId) -> Option<&(InstanceId, String)> {
        self.bound.get(&node)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(&id)
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.instances.contains_key(&id)
    }

    /// Instance whose root is `node`.
    pub fn instance_at(&self, node: NodeId) -> Option<InstanceId> {
        self.by_node.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::primitives::Template;

    fn component() -> Component {
        Component::new(|_| Template::default())
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut registry = Registry::default();
        let a = registry.allocate(&component(), Box::new(()));
        let b = registry.allocate(&component(), Box::new(()));
        registry.release(a);
        let c = registry.allocate(&component(), Box::new(()));

        assert!(a < b && b < c);
        assert_eq!(registry.len(), 2);
        assert!(!registry.contains(a));
    }

    #[test]
    fn test_attach_moves_node_mapping() {
        let mut doc = Document::default();
        let first = doc.create_element("div");
        let second = doc.create_element("div");
        let mut registry = Registry::default();
        let id = registry.allocate(&component(), Box::new(()));

        registry.attach(id, first);
        assert_eq!(registry.instance_at(first), Some(id));

        registry.attach(id, second);
        assert_eq!(registry.instance_at(first), None);
        assert_eq!(registry.instance_at(second), Some(id));

        registry.detach_node(id);
        assert_eq!(registry.instance_at(second), None);
        assert!(registry.get(id).unwrap().node.is_none());
    }

    #[test]
    fn test_binding_table_and_reverse_index() {
        let mut doc = Document::default();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let mut registry = Registry::default();
        let owner = registry.allocate(&component(), Box::new(()));

        registry.set_binding(owner, "panel", a);
        assert_eq!(registry.binding(owner, "panel"), Some(a));

        // Rebinding the name to another node frees the old node's entry
        registry.set_binding(owner, "panel", b);
        assert_eq!(registry.binding(owner, "panel"), Some(b));
        assert!(registry.bound_at(a).is_none());

        registry.unbind_node(b);
        assert_eq!(registry.binding(owner, "panel"), None);
    }

    #[test]
    fn test_release_clears_bindings() {
        let mut doc = Document::default();
        let node = doc.create_element("div");
        let mut registry = Registry::default();
        let owner = registry.allocate(&component(), Box::new(()));
        registry.set_binding(owner, "x", node);

        registry.release(owner);
        assert!(registry.bound_at(node).is_none());
        assert_eq!(registry.binding(owner, "x"), None);
    }

    #[test]
    fn test_unbind_node_of_respects_owner() {
        let mut doc = Document::default();
        let node = doc.create_element("div");
        let mut registry = Registry::default();
        let a = registry.allocate(&component(), Box::new(()));
        let b = registry.allocate(&component(), Box::new(()));
        registry.set_binding(a, "x", node);

        registry.unbind_node_of(b, node);
        assert_eq!(registry.binding(a, "x"), Some(node));
        registry.unbind_node_of(a, node);
        assert_eq!(registry.binding(a, "x"), None);
    }
}
