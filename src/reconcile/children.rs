//! Child list reconciliation.
//!
//! Element children are matched first, by key when every live and every new
//! element child carries one, by position otherwise. Text children are then
//! fitted into the non-element positions and the final order is enforced.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, trace, warn};

use super::Engine;
use super::keyed;
use crate::config::MoveStrategy;
use crate::error::Result;
use crate::primitives::Elementable;
use crate::types::{InstanceId, Key, NodeId};

/// A keyed child taken out of the list that reappears elsewhere.
enum Carried {
    /// Detached live node, reinserted as is.
    Node(NodeId),
    /// Runtime record whose node was destroyed, rebuilt at the new position.
    Instance(InstanceId),
}

impl Engine<'_> {
    pub(crate) fn reconcile_children(
        &mut self,
        parent: NodeId,
        children: &[Elementable],
        owner: Option<InstanceId>,
    ) -> Result<()> {
        let descs: Vec<&Elementable> = children.iter().filter(|c| !c.is_text()).collect();
        let elements = match self.keyed_inputs(parent, &descs) {
            Some((old_keys, new_keys)) => self.keyed(parent, &descs, &old_keys, &new_keys, owner)?,
            None => self.positional(parent, &descs, owner)?,
        };
        let ordered = self.place_text(parent, children, &elements)?;
        self.sync_bindings(children, &ordered, owner);
        Ok(())
    }

    /// Keys for both sides, or `None` when keyed diffing does not apply.
    fn keyed_inputs(&self, parent: NodeId, descs: &[&Elementable]) -> Option<(Vec<Key>, Vec<Key>)> {
        let doc = self.ctx.document.borrow();
        let live = doc.element_children(parent);
        if live.is_empty() || descs.is_empty() {
            return None;
        }
        let old_keys: Vec<Key> = live
            .iter()
            .map(|&node| doc.key(node).cloned())
            .collect::<Option<_>>()?;
        let new_keys: Vec<Key> = descs
            .iter()
            .map(|desc| desc.key().cloned())
            .collect::<Option<_>>()?;
        if has_duplicates(&old_keys) || has_duplicates(&new_keys) {
            warn!(%parent, "duplicate keys among siblings, falling back to positional diffing");
            return None;
        }
        Some((old_keys, new_keys))
    }

    /// Pairwise reconcile, then append or trim at the tail.
    fn positional(
        &mut self,
        parent: NodeId,
        descs: &[&Elementable],
        owner: Option<InstanceId>,
    ) -> Result<Vec<NodeId>> {
        let ctx = self.ctx;
        let live = ctx.document.borrow().element_children(parent);
        let common = live.len().min(descs.len());
        let mut ordered = Vec::with_capacity(descs.len());

        for (&node, desc) in live.iter().zip(descs.iter()) {
            ordered.push(self.reconcile_child(node, desc, owner)?);
        }
        for desc in &descs[common..] {
            let node = self.create(desc, owner)?;
            ctx.document.borrow_mut().append_child(parent, node)?;
            ordered.push(node);
        }
        for &node in live[common..].iter().rev() {
            self.discard(node, None)?;
        }
        Ok(ordered)
    }

    /// LIS-driven keyed reconciliation.
    fn keyed(
        &mut self,
        parent: NodeId,
        descs: &[&Elementable],
        old_keys: &[Key],
        new_keys: &[Key],
        owner: Option<InstanceId>,
    ) -> Result<Vec<NodeId>> {
        let ctx = self.ctx;
        let live = ctx.document.borrow().element_children(parent);
        let plan = keyed::plan(old_keys, new_keys);
        trace!(
            %parent,
            stable = plan.stable.len(),
            moved = plan.moved().len(),
            removed = plan.removed().len(),
            created = plan.created().len(),
            "keyed plan"
        );

        // Stable children are reconciled where they stand
        let mut stable: HashMap<usize, NodeId> = HashMap::with_capacity(plan.stable.len());
        for &old in &plan.stable {
            if let Some(new) = plan.new_index_of(old) {
                let node = self.reconcile_child(live[old], descs[new], owner)?;
                stable.insert(new, node);
            }
        }

        // Everything else leaves the tree; surviving keys are carried
        let mut carried: HashMap<Key, Carried> = HashMap::new();
        for old in (0..live.len()).rev() {
            if plan.is_stable(old) {
                continue;
            }
            let node = live[old];
            if plan.new_index_of(old).is_none() {
                self.discard(node, None)?;
                continue;
            }
            match ctx.config.move_strategy {
                MoveStrategy::Relocate => {
                    ctx.document.borrow_mut().detach(node)?;
                    carried.insert(old_keys[old].clone(), Carried::Node(node));
                }
                MoveStrategy::Recreate => {
                    let instance = ctx.registry.borrow().instance_at(node);
                    if let Some(id) = instance {
                        ctx.registry.borrow_mut().detach_node(id);
                        carried.insert(old_keys[old].clone(), Carried::Instance(id));
                    }
                    self.discard(node, None)?;
                }
            }
        }

        // Walk the desired order, inserting before the next stable node
        let mut anchors: Vec<(usize, NodeId)> = stable.iter().map(|(&i, &n)| (i, n)).collect();
        anchors.sort_unstable_by_key(|&(i, _)| i);
        let mut cursor = 0;
        let mut ordered = Vec::with_capacity(descs.len());
        for (new, desc) in descs.iter().enumerate() {
            if let Some(&node) = stable.get(&new) {
                ordered.push(node);
                cursor += 1;
                continue;
            }
            let reference = anchors.get(cursor).map(|&(_, node)| node);
            let node = match carried.remove(&new_keys[new]) {
                Some(Carried::Node(node)) => {
                    ctx.document.borrow_mut().insert_before(parent, node, reference)?;
                    self.reconcile_child(node, desc, owner)?
                }
                Some(Carried::Instance(id)) => {
                    let node = self.recreate(id, desc, owner)?;
                    ctx.document.borrow_mut().insert_before(parent, node, reference)?;
                    node
                }
                None => {
                    let node = self.create(desc, owner)?;
                    ctx.document.borrow_mut().insert_before(parent, node, reference)?;
                    node
                }
            };
            ordered.push(node);
        }

        for (_, leftover) in carried {
            match leftover {
                Carried::Node(node) => self.discard(node, None)?,
                Carried::Instance(id) => {
                    ctx.registry.borrow_mut().release(id);
                }
            }
        }
        Ok(ordered)
    }

    /// Rebuild a carried instance at its new position with its state intact.
    fn recreate(&mut self, id: InstanceId, desc: &Elementable, owner: Option<InstanceId>) -> Result<NodeId> {
        let ctx = self.ctx;
        match desc {
            Elementable::Component(component) => {
                ctx.registry.borrow_mut().rebind(id, component);
                debug!(instance = %id, "recreating moved component");
                self.build_instance_root(id)
            }
            _ => {
                ctx.registry.borrow_mut().release(id);
                debug!(instance = %id, "component instance destroyed");
                self.create(desc, owner)
            }
        }
    }

    /// Fit text descriptions into the non-element positions, reusing live
    /// text nodes in order, and enforce the final child order.
    fn place_text(
        &mut self,
        parent: NodeId,
        children: &[Elementable],
        elements: &[NodeId],
    ) -> Result<Vec<NodeId>> {
        let mut doc = self.ctx.document.borrow_mut();
        let mut pool: VecDeque<NodeId> = doc
            .children(parent)
            .iter()
            .copied()
            .filter(|&child| doc.text(child).is_some() && !elements.contains(&child))
            .collect();
        let mut elements = elements.iter().copied();
        let mut ordered = Vec::with_capacity(children.len());

        for child in children {
            match child {
                Elementable::Text(text) => {
                    let node = match pool.pop_front() {
                        Some(node) => {
                            if doc.text(node) != Some(text.as_str()) {
                                doc.set_text(node, text.as_str())?;
                            }
                            node
                        }
                        None => doc.create_text(text.as_str()),
                    };
                    ordered.push(node);
                }
                _ => ordered.extend(elements.next()),
            }
        }
        for leftover in pool {
            doc.free_subtree(leftover)?;
        }

        for (position, &node) in ordered.iter().enumerate() {
            let current = doc.children(parent).get(position).copied();
            if current != Some(node) {
                doc.insert_before(parent, node, current)?;
            }
        }
        Ok(ordered)
    }

    /// Register the owner's bindings for this child list and drop stale ones.
    fn sync_bindings(&mut self, children: &[Elementable], ordered: &[NodeId], owner: Option<InstanceId>) {
        let Some(owner) = owner else {
            return;
        };
        let mut registry = self.ctx.registry.borrow_mut();
        for (desc, &node) in children.iter().zip(ordered) {
            match desc.binding() {
                Some(name) => registry.set_binding(owner, name, node),
                None => registry.unbind_node_of(owner, node),
            }
        }
    }
}

fn has_duplicates(keys: &[Key]) -> bool {
    let mut seen = HashSet::with_capacity(keys.len());
    keys.iter().any(|key| !seen.insert(key))
}
