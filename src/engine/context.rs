//! Engine context - the state one mounted tree owns.
//!
//! Replaces process-wide tables: every [`Runtime`](crate::Runtime) owns one
//! `Context`, so independent trees never share instances or queues. Each part
//! sits in its own `RefCell` and borrows are never held across producer or
//! handler calls.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use tracing::{trace, warn};

use super::registry::{Registry, StateCell};
use super::scheduler::Scheduler;
use crate::config::EngineConfig;
use crate::dom::Document;
use crate::types::InstanceId;

/// Host hook invoked when a flush becomes scheduled.
pub(crate) type WakeFn = Rc<dyn Fn()>;

pub(crate) struct Context {
    pub config: EngineConfig,
    pub document: RefCell<Document>,
    pub registry: RefCell<Registry>,
    pub scheduler: RefCell<Scheduler>,
    wake: RefCell<Option<WakeFn>>,
    rendering: Cell<usize>,
    flushing: Cell<bool>,
    /// Instances whose producer already ran in the current flush pass.
    rendered: RefCell<HashSet<InstanceId>>,
}

impl Context {
    pub fn new(config: EngineConfig) -> Rc<Self> {
        let document = Document::new(&config.root_tag);
        Rc::new(Self {
            config,
            document: RefCell::new(document),
            registry: RefCell::new(Registry::default()),
            scheduler: RefCell::new(Scheduler::default()),
            wake: RefCell::new(None),
            rendering: Cell::new(0),
            flushing: Cell::new(false),
            rendered: RefCell::new(HashSet::new()),
        })
    }

    pub fn set_wake(&self, wake: Option<WakeFn>) {
        *self.wake.borrow_mut() = wake;
    }

    /// Request a re-render of `id` at the next checkpoint.
    pub fn enqueue(&self, id: InstanceId) {
        let scheduled = self.scheduler.borrow_mut().enqueue(id);
        if !scheduled {
            return;
        }
        trace!(instance = %id, "flush scheduled");
        let wake = self.wake.borrow().clone();
        if let Some(wake) = wake {
            wake();
        }
    }

    pub fn state_cell(&self, id: InstanceId) -> Option<StateCell> {
        let registry = self.registry.try_borrow().ok()?;
        registry.get(id).map(|instance| instance.state.clone())
    }

    /// Mutate an instance's state and enqueue it when `f` reports a change.
    pub fn update_state(&self, id: InstanceId, f: impl FnOnce(&mut dyn Any) -> bool) -> bool {
        let Some(cell) = self.state_cell(id) else {
            trace!(instance = %id, "state update on destroyed instance ignored");
            return false;
        };
        let changed = match cell.try_borrow_mut() {
            Ok(mut state) => f(&mut **state),
            Err(_) => {
                warn!(instance = %id, "state is borrowed, update dropped");
                false
            }
        };
        if changed {
            self.enqueue(id);
        }
        changed
    }

    // =========================================================================
    // Reentrancy guards
    // =========================================================================

    pub fn is_rendering(&self) -> bool {
        self.rendering.get() > 0
    }

    pub fn enter_render(&self) {
        self.rendering.set(self.rendering.get() + 1);
    }

    pub fn leave_render(&self) {
        self.rendering.set(self.rendering.get().saturating_sub(1));
    }

    /// Returns `false` when a flush is already running.
    pub fn begin_flush(&self) -> bool {
        !self.flushing.replace(true)
    }

    pub fn end_flush(&self) {
        self.flushing.set(false);
        self.rendered.borrow_mut().clear();
    }

    /// Forget which instances rendered; called at the start of each pass.
    pub fn start_pass(&self) {
        self.rendered.borrow_mut().clear();
    }

    /// Record a producer run. Only tracked while a flush is running.
    pub fn note_rendered(&self, id: InstanceId) {
        if self.flushing.get() {
            self.rendered.borrow_mut().insert(id);
        }
    }

    /// Whether `id` already rendered in the current pass, for example
    /// through a parent that was queued in the same batch.
    pub fn rendered_this_pass(&self, id: InstanceId) -> bool {
        self.rendered.borrow().contains(&id)
    }
}
