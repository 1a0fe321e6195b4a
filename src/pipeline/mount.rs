//! Mount API - Attaching engine output and driving the update loop.
//!
//! [`Runtime`] owns one live tree. External collaborators (a router, page
//! content) use it to build subtrees and attach them; the host event loop
//! feeds events in with [`Runtime::dispatch`] and runs the microtask
//! checkpoint with [`Runtime::flush`].
//!
//! # Example
//!
//! ```
//! use spark_dom::{Component, Runtime, Template};
//!
//! let runtime = Runtime::new();
//! let counter = Component::new(|cx| {
//!     let count = cx.state::<u32>().unwrap_or_default();
//!     let bump = cx.setter(|n: &mut u32, by: u32| *n += by);
//!     Template::new("button")
//!         .on("click", move |_, _| {
//!             bump.set(1);
//!         })
//!         .child(count)
//! })
//! .with_initial_state(0u32);
//!
//! let button = runtime.append_child(runtime.root(), counter).unwrap();
//! runtime.dispatch(button, &spark_dom::Event::new("click")).unwrap();
//! assert_eq!(runtime.markup(runtime.root()).unwrap(), "<body><button>1</button></body>");
//! ```
//!
//! # Host loop
//!
//! ```ignore
//! runtime.on_flush_scheduled(move || queue_microtask(...));
//! // after each host task:
//! runtime.flush();
//! ```

use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::dom::{Document, Listener, to_markup};
use crate::engine::Context;
use crate::error::{Error, Result};
use crate::primitives::{Binding, Elementable, Scope};
use crate::reconcile::{self, Engine, PendingMounts};
use crate::types::{Event, InstanceId, NodeId};

// =============================================================================
// Runtime
// =============================================================================

/// Handle to one live tree and its engine state. Cloning shares the tree.
#[derive(Clone)]
pub struct Runtime {
    ctx: Rc<Context>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            ctx: Context::new(config),
        }
    }

    pub(crate) fn from_context(ctx: Rc<Context>) -> Self {
        Self { ctx }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    /// The document's permanent root element.
    pub fn root(&self) -> NodeId {
        self.ctx.document.borrow().root()
    }

    // =========================================================================
    // Mount Surface
    // =========================================================================

    /// Build a detached subtree. Its `mount` handlers are dropped; use
    /// [`create_with_mounts`](Self::create_with_mounts) to keep them.
    pub fn create(&self, elementable: impl Into<Elementable>) -> Result<NodeId> {
        let (node, mounts) = self.create_with_mounts(elementable)?;
        if !mounts.is_empty() {
            trace!(%node, dropped = mounts.len(), "created without running mount handlers");
        }
        Ok(node)
    }

    /// Build a detached subtree and hand back its `mount` handlers, to be run
    /// once the caller has attached it.
    pub fn create_with_mounts(&self, elementable: impl Into<Elementable>) -> Result<(NodeId, PendingMounts)> {
        let elementable = elementable.into();
        let mut engine = Engine::new(&self.ctx);
        let node = engine.create(&elementable, None)?;
        Ok((node, engine.finish()))
    }

    /// Replace a live node with a new subtree, tearing down the old one.
    pub fn replace_with(&self, old: NodeId, elementable: impl Into<Elementable>) -> Result<NodeId> {
        {
            let doc = self.ctx.document.borrow();
            if old == doc.root() {
                return Err(Error::RootNode(old));
            }
            if doc.node(old)?.parent().is_none() {
                return Err(Error::Detached(old));
            }
        }
        let elementable = elementable.into();
        let (new, mounts) = {
            let mut engine = Engine::new(&self.ctx);
            let new = engine.create(&elementable, None)?;
            engine.replace(old, new, None)?;
            debug!(%old, %new, "replaced");
            (new, engine.finish())
        };
        mounts.run();
        Ok(new)
    }

    /// Append a new subtree as the last child of `parent`.
    pub fn append_child(&self, parent: NodeId, elementable: impl Into<Elementable>) -> Result<NodeId> {
        self.insert_before(parent, None, elementable)
    }

    /// Insert a new subtree before `reference`, or at the end when `None`.
    pub fn insert_before(
        &self,
        parent: NodeId,
        reference: Option<NodeId>,
        elementable: impl Into<Elementable>,
    ) -> Result<NodeId> {
        {
            let doc = self.ctx.document.borrow();
            if doc.node(parent)?.is_text() {
                return Err(Error::NotAnElement(parent));
            }
            if let Some(reference) = reference {
                if doc.parent(reference) != Some(parent) {
                    return Err(Error::NotAChild {
                        parent,
                        child: reference,
                    });
                }
            }
        }
        let elementable = elementable.into();
        let (node, mounts) = {
            let mut engine = Engine::new(&self.ctx);
            let node = engine.create(&elementable, None)?;
            let inserted = self
                .ctx
                .document
                .borrow_mut()
                .insert_before(parent, node, reference);
            if let Err(err) = inserted {
                engine.discard(node, None)?;
                return Err(err);
            }
            (node, engine.finish())
        };
        mounts.run();
        Ok(node)
    }

    /// Detach a subtree and destroy every instance and binding under it.
    pub fn unmount(&self, node: NodeId) -> Result<()> {
        if node == self.root() {
            return Err(Error::RootNode(node));
        }
        let mut engine = Engine::new(&self.ctx);
        engine.discard(node, None)?;
        debug!(%node, "unmounted");
        Ok(())
    }

    // =========================================================================
    // Host Loop
    // =========================================================================

    /// Deliver an event to `target`'s listeners, then bubble to its
    /// ancestors until a listener stops propagation. The microtask
    /// checkpoint runs afterwards. Returns how many listeners ran.
    pub fn dispatch(&self, target: NodeId, event: &Event) -> Result<usize> {
        let path = {
            let doc = self.ctx.document.borrow();
            doc.node(target)?;
            let mut path = vec![target];
            let mut current = target;
            while let Some(parent) = doc.parent(current) {
                path.push(parent);
                current = parent;
            }
            path
        };

        let mut invoked = 0;
        for node in path {
            let listeners: Vec<Listener> = self
                .ctx
                .document
                .borrow()
                .element(node)
                .map(|el| {
                    el.listeners
                        .iter()
                        .filter(|l| l.event == event.name)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            for listener in listeners {
                let scope = Scope::new(Rc::downgrade(&self.ctx), listener.scope, Some(node));
                (listener.handler)(&scope, event);
                invoked += 1;
            }
            if event.is_propagation_stopped() {
                break;
            }
        }
        trace!(%target, event = %event.name, invoked, "dispatched");
        self.flush();
        Ok(invoked)
    }

    /// Run `f` as one host task followed by the microtask checkpoint.
    pub fn batch<R>(&self, f: impl FnOnce(&Runtime) -> R) -> R {
        let result = f(self);
        self.flush();
        result
    }

    /// The microtask checkpoint. Returns how many instances re-rendered.
    pub fn flush(&self) -> usize {
        reconcile::flush(&self.ctx)
    }

    pub fn has_pending(&self) -> bool {
        !self.ctx.scheduler.borrow().is_idle()
    }

    /// Called whenever a flush becomes scheduled, so the host can queue its
    /// microtask.
    pub fn on_flush_scheduled(&self, wake: impl Fn() + 'static) {
        self.ctx.set_wake(Some(Rc::new(wake)));
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.ctx.document.borrow())
    }

    /// Serialized HTML of a live subtree.
    pub fn markup(&self, node: NodeId) -> Option<String> {
        to_markup(&self.ctx.document.borrow(), node)
    }

    /// Instance rooted at `node`.
    pub fn instance_of(&self, node: NodeId) -> Option<InstanceId> {
        self.ctx.registry.borrow().instance_at(node)
    }

    /// Current root node of an instance.
    pub fn node_of(&self, id: InstanceId) -> Option<NodeId> {
        self.ctx.registry.borrow().get(id).and_then(|instance| instance.node)
    }

    pub fn instance_count(&self) -> usize {
        self.ctx.registry.borrow().len()
    }

    pub fn is_live(&self, id: InstanceId) -> bool {
        self.ctx.registry.borrow().contains(id)
    }

    /// Clone of an instance's state.
    pub fn state<S: Clone + 'static>(&self, id: InstanceId) -> Option<S> {
        let cell = self.ctx.state_cell(id)?;
        let state = cell.try_borrow().ok()?;
        (**state).downcast_ref::<S>().cloned()
    }

    /// How many times an instance's producer has run.
    pub fn render_count(&self, id: InstanceId) -> Option<u64> {
        self.ctx.registry.borrow().get(id).map(|instance| instance.renders)
    }

    /// Call context of an instance, for updates from outside the tree.
    pub fn scope(&self, id: InstanceId) -> Option<Scope> {
        let target = self.node_of(id);
        self.is_live(id)
            .then(|| Scope::new(Rc::downgrade(&self.ctx), Some(id), target))
    }

    pub fn binding(&self, id: InstanceId, name: &str) -> Option<Binding> {
        self.scope(id)?.binding(name)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.ctx.config)
            .field("instances", &self.instance_count())
            .field("pending", &self.has_pending())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
