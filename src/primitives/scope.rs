//! Scope - the call context handed to producers and handlers.
//!
//! A scope names the nearest enclosing component instance and, for handlers,
//! the concrete node the handler is attached to. It holds only a weak handle
//! to the runtime: once the runtime is dropped or the instance destroyed,
//! every operation quietly does nothing.

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::dom::Document;
use crate::engine::Context;
use crate::pipeline::Runtime;
use crate::reconcile;
use crate::types::{InstanceId, NodeId};

// =============================================================================
// Scope
// =============================================================================

#[derive(Clone)]
pub struct Scope {
    ctx: Weak<Context>,
    instance: Option<InstanceId>,
    target: Option<NodeId>,
}

impl Scope {
    pub(crate) fn new(ctx: Weak<Context>, instance: Option<InstanceId>, target: Option<NodeId>) -> Self {
        Self {
            ctx,
            instance,
            target,
        }
    }

    /// Nearest enclosing component instance, if any.
    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }

    /// Node the running handler is attached to.
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// Current root node of the enclosing component.
    pub fn node(&self) -> Option<NodeId> {
        let ctx = self.ctx.upgrade()?;
        let registry = ctx.registry.try_borrow().ok()?;
        registry.get(self.instance?)?.node
    }

    /// Read the component state as `S`. `None` if the type does not match.
    pub fn with_state<S: 'static, R>(&self, f: impl FnOnce(&S) -> R) -> Option<R> {
        let ctx = self.ctx.upgrade()?;
        let cell = ctx.state_cell(self.instance?)?;
        let state = cell.try_borrow().ok()?;
        (**state).downcast_ref::<S>().map(f)
    }

    /// Clone of the component state.
    pub fn state<S: Clone + 'static>(&self) -> Option<S> {
        self.with_state(S::clone)
    }

    /// Mutate the state in place and schedule a re-render.
    pub fn update<S: 'static>(&self, f: impl FnOnce(&mut S)) -> bool {
        let (Some(ctx), Some(id)) = (self.ctx.upgrade(), self.instance) else {
            return false;
        };
        ctx.update_state(id, |state| match state.downcast_mut::<S>() {
            Some(state) => {
                f(state);
                true
            }
            None => false,
        })
    }

    pub fn set_state<S: 'static>(&self, value: S) -> bool {
        self.update(move |state: &mut S| *state = value)
    }

    /// Entry point that writes one field of the state and schedules a
    /// re-render. Setters outlive the render that created them.
    pub fn setter<S: 'static, T: 'static>(&self, field: impl Fn(&mut S, T) + 'static) -> Setter<T> {
        Setter {
            ctx: self.ctx.clone(),
            instance: self.instance,
            apply: Rc::new(move |state: &mut dyn Any, value: T| match state.downcast_mut::<S>() {
                Some(state) => {
                    field(state, value);
                    true
                }
                None => false,
            }),
        }
    }

    /// Resolve a binding declared under this component.
    pub fn binding(&self, name: &str) -> Option<Binding> {
        let ctx = self.ctx.upgrade()?;
        let instance = self.instance?;
        let node = ctx.registry.try_borrow().ok()?.binding(instance, name)?;
        Some(Binding {
            ctx: self.ctx.clone(),
            instance,
            name: name.to_string(),
            node,
        })
    }

    /// Every binding of this component, by name.
    pub fn bindings(&self) -> Vec<Binding> {
        let (Some(ctx), Some(instance)) = (self.ctx.upgrade(), self.instance) else {
            return Vec::new();
        };
        let Ok(registry) = ctx.registry.try_borrow() else {
            return Vec::new();
        };
        registry
            .get(instance)
            .map(|record| {
                record
                    .bindings
                    .iter()
                    .map(|(name, &node)| Binding {
                        ctx: self.ctx.clone(),
                        instance,
                        name: name.clone(),
                        node,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Re-render the component now instead of at the next checkpoint.
    ///
    /// Called while a render is in progress, the request is queued instead.
    pub fn rerender(&self) -> bool {
        let (Some(ctx), Some(id)) = (self.ctx.upgrade(), self.instance) else {
            return false;
        };
        if ctx.is_rendering() {
            ctx.enqueue(id);
            return false;
        }
        match reconcile::rerender_instance(&ctx, id) {
            Ok(rendered) => rendered,
            Err(err) => {
                warn!(instance = %id, %err, "re-render failed");
                false
            }
        }
    }

    /// Mount surface of the owning runtime, for imperative updates.
    pub fn runtime(&self) -> Option<Runtime> {
        self.ctx.upgrade().map(Runtime::from_context)
    }

    /// Read the live tree. `None` while the tree is being mutated.
    pub fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> Option<R> {
        let ctx = self.ctx.upgrade()?;
        let doc = ctx.document.try_borrow().ok()?;
        Some(f(&doc))
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("instance", &self.instance)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Setter
// =============================================================================

/// Per-field state setter bound to one component instance.
pub struct Setter<T> {
    ctx: Weak<Context>,
    instance: Option<InstanceId>,
    apply: Rc<dyn Fn(&mut dyn Any, T) -> bool>,
}

impl<T> Setter<T> {
    /// Write the field and enqueue the instance. Never renders synchronously.
    pub fn set(&self, value: T) -> bool {
        let (Some(ctx), Some(id)) = (self.ctx.upgrade(), self.instance) else {
            return false;
        };
        ctx.update_state(id, |state| (self.apply)(state, value))
    }

    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            instance: self.instance,
            apply: self.apply.clone(),
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Binding
// =============================================================================

/// Named handle to a bound descendant of a component.
#[derive(Clone)]
pub struct Binding {
    ctx: Weak<Context>,
    instance: InstanceId,
    name: String,
    node: NodeId,
}

impl Binding {
    /// Bound node as of resolution.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Re-run the owner's producer and reconcile only the bound subtree.
    /// Returns `false` when the binding no longer resolves.
    pub fn rerender(&self) -> bool {
        let Some(ctx) = self.ctx.upgrade() else {
            return false;
        };
        if ctx.is_rendering() {
            ctx.enqueue(self.instance);
            return false;
        }
        match reconcile::rerender_binding(&ctx, self.instance, &self.name) {
            Ok(rendered) => rendered,
            Err(err) => {
                warn!(instance = %self.instance, binding = %self.name, %err, "binding re-render failed");
                false
            }
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("instance", &self.instance)
            .field("name", &self.name)
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}
