//! Node reconciliation - patch in place, or escalate to replacement.
//!
//! Order of checks for a template:
//! 1. `clone_from` source not structurally equal -> replace with a clone
//! 2. raw HTML that differs structurally -> replace
//! 3. tag change -> replace
//! 4. patch properties, then reconcile children

use tracing::{debug, trace};

use super::Engine;
use super::patch::patch_element;
use crate::dom::Identity;
use crate::dom::markup::{parse_fragment, snapshot_children};
use crate::error::{Error, Result};
use crate::primitives::{Elementable, Template};
use crate::types::{InstanceId, NodeId};

impl Engine<'_> {
    /// Reconcile a live child against any description. Returns the node now
    /// standing at that position.
    pub(crate) fn reconcile_child(
        &mut self,
        node: NodeId,
        elementable: &Elementable,
        owner: Option<InstanceId>,
    ) -> Result<NodeId> {
        let ctx = self.ctx;
        match elementable {
            Elementable::Text(text) => self.reconcile_text(node, text),
            Elementable::Component(component) => {
                let existing = ctx.registry.borrow().instance_at(node);
                match existing {
                    Some(id) => {
                        ctx.registry.borrow_mut().rebind(id, component);
                        self.rerender_at(id)
                    }
                    None => {
                        let new = self.create_component(component)?;
                        self.replace(node, new, None)?;
                        Ok(new)
                    }
                }
            }
            Elementable::Template(template) => {
                // A component root turning into a plain template ends the instance
                let existing = ctx.registry.borrow().instance_at(node);
                if let Some(id) = existing {
                    ctx.registry.borrow_mut().release(id);
                    debug!(instance = %id, "component instance destroyed");
                }
                self.reconcile_node(node, template, owner)
            }
        }
    }

    /// Re-produce an instance and reconcile its current root.
    pub(crate) fn rerender_at(&mut self, id: InstanceId) -> Result<NodeId> {
        let node = self
            .ctx
            .registry
            .borrow()
            .get(id)
            .and_then(|instance| instance.node)
            .ok_or(Error::UnknownInstance(id))?;
        let template = self.produce(id)?;
        let result = self.reconcile_node(node, &template, Some(id))?;
        if result != node {
            self.ctx.registry.borrow_mut().attach(id, result);
        }
        Ok(result)
    }

    /// Reconcile a live node against a template.
    pub(crate) fn reconcile_node(
        &mut self,
        node: NodeId,
        template: &Template,
        owner: Option<InstanceId>,
    ) -> Result<NodeId> {
        let ctx = self.ctx;
        // The instance rooted here survives a replacement of its own root
        let keep = owner.filter(|&id| ctx.registry.borrow().instance_at(node) == Some(id));

        if let Some(source) = template.clone_from {
            let copy = {
                let mut doc = ctx.document.borrow_mut();
                if doc.is_equal_node(node, source) {
                    return Ok(node);
                }
                let copy = doc.deep_clone(source)?;
                doc.node_mut(copy)?.identity = Identity {
                    key: template.key.clone(),
                    binding: template.binding.clone(),
                };
                copy
            };
            self.replace(node, copy, keep)?;
            return Ok(copy);
        }

        if let Some(raw) = &template.raw_html {
            let unchanged = match parse_fragment(raw) {
                Ok(parsed) => parsed == snapshot_children(&ctx.document.borrow(), node),
                Err(_) => false,
            };
            if !unchanged {
                trace!(%node, "raw html changed, replacing");
                return self.replace_template(node, template, owner, keep);
            }
        }

        let tag = template.tag_or(&ctx.config.default_tag);
        let same_tag = ctx.document.borrow().tag(node) == Some(tag);
        if !same_tag {
            debug!(%node, tag, "tag changed, replacing node");
            return self.replace_template(node, template, owner, keep);
        }

        patch_element(&mut ctx.document.borrow_mut(), node, template, owner)?;
        if template.raw_html.is_none() {
            self.reconcile_children(node, &template.children, owner)?;
        }
        Ok(node)
    }

    fn replace_template(
        &mut self,
        node: NodeId,
        template: &Template,
        owner: Option<InstanceId>,
        keep: Option<InstanceId>,
    ) -> Result<NodeId> {
        let new = self.create_template(template, owner)?;
        self.replace(node, new, keep)?;
        Ok(new)
    }

    /// Put `new` where `old` stands and discard `old` with everything under
    /// it. `keep` names an instance whose record survives (and moves to
    /// `new`). A binding held on `old` moves to `new` when the name matches.
    pub(crate) fn replace(&mut self, old: NodeId, new: NodeId, keep: Option<InstanceId>) -> Result<()> {
        let ctx = self.ctx;
        let bound = ctx.registry.borrow().bound_at(old).cloned();
        {
            let mut doc = ctx.document.borrow_mut();
            if doc.parent(old).is_some() {
                doc.replace(old, new)?;
            } else if old == doc.root() {
                return Err(Error::RootNode(old));
            }
        }
        if let Some(id) = keep {
            ctx.registry.borrow_mut().attach(id, new);
        }
        self.discard(old, keep)?;

        let new_binding = ctx
            .document
            .borrow()
            .identity(new)
            .and_then(|identity| identity.binding.clone());
        if let Some((owner, name)) = bound {
            if new_binding.as_deref() == Some(name.as_str()) {
                ctx.registry.borrow_mut().set_binding(owner, &name, new);
            }
        }
        Ok(())
    }

    /// Free a subtree, destroying every instance rooted inside it except
    /// `keep`, and dropping bindings that point into it.
    pub(crate) fn discard(&mut self, node: NodeId, keep: Option<InstanceId>) -> Result<()> {
        let ctx = self.ctx;
        let freed = ctx.document.borrow_mut().free_subtree(node)?;
        let mut registry = ctx.registry.borrow_mut();
        for id in freed {
            if let Some(instance) = registry.instance_at(id) {
                if Some(instance) != keep {
                    registry.release(instance);
                    debug!(%instance, "component instance destroyed");
                }
            }
            registry.unbind_node(id);
        }
        Ok(())
    }

    /// Text descriptions update text nodes in place and replace elements.
    pub(crate) fn reconcile_text(&mut self, node: NodeId, text: &str) -> Result<NodeId> {
        let ctx = self.ctx;
        {
            let mut doc = ctx.document.borrow_mut();
            if let Some(current) = doc.text(node) {
                if current != text {
                    doc.set_text(node, text)?;
                }
                return Ok(node);
            }
        }
        let new = ctx.document.borrow_mut().create_text(text);
        self.replace(node, new, None)?;
        Ok(new)
    }
}
