//! Engine - Runtime records, update queue and shared context.
//!
//! - Registry: instance records, node mapping, binding tables
//! - Scheduler: deduplicated re-render batches
//! - Context: one tree's document, registry and scheduler
//!
//! # Architecture
//!
//! Instances are not stamped onto nodes. The registry maps ids to records
//! and nodes back to ids:
//!
//! ```text
//! component-0 -> { node: n3v0, state, producer, bindings: { "list": n7v0 } }
//! n3v0        -> component-0
//! n7v0        -> (component-0, "list")
//! ```

mod bindings;
mod context;
mod registry;
mod scheduler;

pub(crate) use bindings::*;
pub(crate) use context::*;
