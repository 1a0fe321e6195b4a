//! Reconciliation - building live nodes and syncing them with new templates.
//!
//! - `create`: description -> new detached subtree
//! - `diff`: live node + new description -> patched or replaced node
//! - `children`: positional and keyed child list sync
//! - `keyed`: LIS-based reorder planning
//! - `patch`: element property sync
//!
//! # Flow
//!
//! ```text
//! setter.set(v) -> scheduler.enqueue(id)
//! checkpoint    -> flush -> rerender_instance(id)
//!                 -> produce(id) -> reconcile_node(node, template)
//!                 -> run collected mount handlers
//! ```
//!
//! An [`Engine`] lives for one create or reconcile operation. It collects the
//! `mount` handlers met along the way; they run only after the caller has
//! attached the result.

mod children;
mod create;
mod diff;
pub mod keyed;
mod patch;

use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::engine::{Context, find_subnode, find_subtemplate};
use crate::error::Result;
use crate::primitives::{Handler, Scope};
use crate::types::{Event, InstanceId, NodeId};

pub use keyed::{KeyedPlan, longest_increasing_subsequence, plan};

// =============================================================================
// Pending Mounts
// =============================================================================

pub(crate) struct PendingMount {
    handler: Handler,
    scope: Scope,
    node: NodeId,
}

/// `mount` handlers collected while building a subtree, in creation order.
///
/// Run them once the subtree is attached. Handlers whose node was freed in
/// the meantime are skipped.
#[must_use = "mount handlers only run when `run` is called"]
pub struct PendingMounts {
    ctx: Weak<Context>,
    items: Vec<PendingMount>,
}

impl PendingMounts {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Invoke the handlers. Returns how many ran.
    pub fn run(self) -> usize {
        let Some(ctx) = self.ctx.upgrade() else {
            return 0;
        };
        let event = Event::mount();
        let mut ran = 0;
        for mount in self.items {
            let live = ctx.document.borrow().contains(mount.node);
            if !live {
                trace!(node = %mount.node, "mount target freed, skipping");
                continue;
            }
            (mount.handler)(&mount.scope, &event);
            ran += 1;
        }
        ran
    }
}

impl fmt::Debug for PendingMounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingMounts")
            .field("len", &self.items.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Engine
// =============================================================================

pub(crate) struct Engine<'a> {
    ctx: &'a Rc<Context>,
    mounts: Vec<PendingMount>,
}

impl<'a> Engine<'a> {
    pub fn new(ctx: &'a Rc<Context>) -> Self {
        ctx.enter_render();
        Self {
            ctx,
            mounts: Vec::new(),
        }
    }

    fn scope(&self, instance: Option<InstanceId>, target: Option<NodeId>) -> Scope {
        Scope::new(Rc::downgrade(self.ctx), instance, target)
    }

    /// Hand over the collected mount handlers.
    pub fn finish(mut self) -> PendingMounts {
        PendingMounts {
            ctx: Rc::downgrade(self.ctx),
            items: std::mem::take(&mut self.mounts),
        }
    }
}

impl Drop for Engine<'_> {
    fn drop(&mut self) {
        self.ctx.leave_render();
    }
}

// =============================================================================
// Drivers
// =============================================================================

/// Re-run an instance's producer and reconcile its node. `Ok(false)` when
/// the instance no longer exists.
pub(crate) fn rerender_instance(ctx: &Rc<Context>, id: InstanceId) -> Result<bool> {
    if !ctx.registry.borrow().contains(id) {
        return Ok(false);
    }
    let mounts = {
        let mut engine = Engine::new(ctx);
        engine.rerender_at(id)?;
        engine.finish()
    };
    mounts.run();
    Ok(true)
}

/// Reconcile only the subtree bound as `name` under `id`.
pub(crate) fn rerender_binding(ctx: &Rc<Context>, id: InstanceId, name: &str) -> Result<bool> {
    let root = ctx.registry.borrow().get(id).and_then(|instance| instance.node);
    let Some(root) = root else {
        trace!(instance = %id, binding = name, "binding owner gone");
        return Ok(false);
    };
    let mounts = {
        let mut engine = Engine::new(ctx);
        let template = engine.produce(id)?;
        let Some(sub) = find_subtemplate(&template, name) else {
            trace!(instance = %id, binding = name, "binding not in template");
            return Ok(false);
        };
        let node = {
            let doc = ctx.document.borrow();
            let registry = ctx.registry.borrow();
            find_subnode(&doc, &registry, root, name)
        };
        let Some(node) = node else {
            trace!(instance = %id, binding = name, "binding not in live tree");
            return Ok(false);
        };
        let result = engine.reconcile_child(node, sub, Some(id))?;
        ctx.registry.borrow_mut().set_binding(id, name, result);
        engine.finish()
    };
    mounts.run();
    Ok(true)
}

/// Run the microtask checkpoint: re-render every queued instance, batch by
/// batch. Returns the number of instances rendered.
pub(crate) fn flush(ctx: &Rc<Context>) -> usize {
    if !ctx.begin_flush() {
        return 0;
    }
    // A deserialized config may carry zero; one pass always runs
    let passes = ctx.config.max_flush_passes.max(1);
    let mut rendered = 0;
    for pass in 0..passes {
        let batch = ctx.scheduler.borrow_mut().take_batch();
        if batch.is_empty() {
            break;
        }
        debug!(pass, instances = batch.len(), "flushing re-render batch");
        ctx.start_pass();
        for id in batch {
            if ctx.rendered_this_pass(id) {
                trace!(instance = %id, "already rendered through its parent");
                continue;
            }
            match rerender_instance(ctx, id) {
                Ok(true) => rendered += 1,
                Ok(false) => trace!(instance = %id, "skipping destroyed instance"),
                Err(err) => warn!(instance = %id, %err, "re-render failed"),
            }
        }
    }
    ctx.end_flush();
    let left = ctx.scheduler.borrow().len();
    if left > 0 {
        warn!(
            pending = left,
            passes,
            "flush pass limit reached, remaining updates deferred"
        );
    }
    rendered
}
