//! Creation - turning descriptions into new, detached live nodes.

use tracing::{debug, warn};

use super::Engine;
use super::PendingMount;
use super::patch::patch_element;
use crate::dom::Identity;
use crate::dom::markup::{build, parse_fragment};
use crate::error::{Error, Result};
use crate::primitives::{Component, Elementable, Template};
use crate::types::{InstanceId, MOUNT_EVENT, NodeId};

impl Engine<'_> {
    /// Build a new subtree. `owner` is the nearest enclosing instance.
    pub(crate) fn create(&mut self, elementable: &Elementable, owner: Option<InstanceId>) -> Result<NodeId> {
        match elementable {
            Elementable::Text(text) => Ok(self.ctx.document.borrow_mut().create_text(text.clone())),
            Elementable::Template(template) => self.create_template(template, owner),
            Elementable::Component(component) => self.create_component(component),
        }
    }

    /// Fresh instance: evaluate the state initializer once, then build.
    pub(crate) fn create_component(&mut self, component: &Component) -> Result<NodeId> {
        let state = component.initial_state();
        let id = self.ctx.registry.borrow_mut().allocate(component, state);
        debug!(instance = %id, "component instance created");
        self.build_instance_root(id)
    }

    /// Produce and build the root node of an existing instance. Used for new
    /// instances and for keyed moves that carry their record over.
    pub(crate) fn build_instance_root(&mut self, id: InstanceId) -> Result<NodeId> {
        let template = self.produce(id)?;
        let node = self.create_template(&template, Some(id))?;
        self.ctx.registry.borrow_mut().attach(id, node);
        Ok(node)
    }

    /// Invoke an instance's producer and stamp the result with the
    /// instance's key and binding.
    pub(crate) fn produce(&mut self, id: InstanceId) -> Result<Template> {
        let (producer, key, binding, node) = {
            let registry = self.ctx.registry.borrow();
            let instance = registry.get(id).ok_or(Error::UnknownInstance(id))?;
            (
                instance.producer.clone(),
                instance.key.clone(),
                instance.binding.clone(),
                instance.node,
            )
        };
        let scope = self.scope(Some(id), node);
        let mut template = producer(&scope);
        self.ctx.registry.borrow_mut().note_render(id);
        self.ctx.note_rendered(id);
        if key.is_some() {
            template.key = key;
        }
        if binding.is_some() {
            template.binding = binding;
        }
        Ok(template)
    }

    pub(crate) fn create_template(&mut self, template: &Template, owner: Option<InstanceId>) -> Result<NodeId> {
        let ctx = self.ctx;
        if let Some(source) = template.clone_from {
            let mut doc = ctx.document.borrow_mut();
            let node = doc.deep_clone(source)?;
            doc.node_mut(node)?.identity = Identity {
                key: template.key.clone(),
                binding: template.binding.clone(),
            };
            return Ok(node);
        }

        let node = {
            let mut doc = ctx.document.borrow_mut();
            let node = doc.create_element(template.tag_or(&ctx.config.default_tag));
            patch_element(&mut doc, node, template, owner)?;
            node
        };
        if let Some(handler) = template.handler(MOUNT_EVENT) {
            self.mounts.push(PendingMount {
                handler: handler.clone(),
                scope: self.scope(owner, Some(node)),
                node,
            });
        }

        if let Some(raw) = &template.raw_html {
            self.fill_raw(node, raw)?;
            return Ok(node);
        }
        for child in &template.children {
            let child_node = self.create(child, owner)?;
            ctx.document.borrow_mut().append_child(node, child_node)?;
            if let (Some(owner), Some(name)) = (owner, child.binding()) {
                ctx.registry.borrow_mut().set_binding(owner, name, child_node);
            }
        }
        Ok(node)
    }

    /// Replace `node`'s children with parsed raw HTML. Markup that does not
    /// parse is shown as text.
    pub(crate) fn fill_raw(&mut self, node: NodeId, raw: &str) -> Result<()> {
        let existing = self.ctx.document.borrow().children(node).to_vec();
        for child in existing {
            self.discard(child, None)?;
        }
        let mut doc = self.ctx.document.borrow_mut();
        let built = match parse_fragment(raw) {
            Ok(parsed) => build(&mut doc, &parsed)?,
            Err(err) => {
                warn!(%node, %err, "unparsable raw html, rendering as text");
                vec![doc.create_text(raw)]
            }
        };
        for child in built {
            doc.append_child(node, child)?;
        }
        Ok(())
    }
}
