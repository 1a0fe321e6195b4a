//! # spark-dom
//!
//! Declarative UI rendering engine with keyed reconciliation.
//!
//! Plain data descriptions ([`Template`]s) and stateful [`Component`]s are
//! turned into a live presentation tree. When component state changes, the
//! affected instances are re-rendered at the next checkpoint and the live
//! tree is patched in place, keeping component identity (and state) for
//! every node that stays at a matching position or key.
//!
//! ## Architecture
//!
//! ```text
//! Elementable -> create -> live nodes + instance records
//! setter.set  -> scheduler -> flush -> producer -> reconcile -> patch / replace
//! ```
//!
//! Everything one tree needs lives in a context owned by its [`Runtime`];
//! independent runtimes share nothing.
//!
//! ## Modules
//!
//! - [`types`] - Handles and identity tokens (NodeId, InstanceId, Key, Event)
//! - [`dom`] - Arena-backed live tree and HTML markup
//! - [`primitives`] - Template, Component, Elementable, Scope
//! - [`engine`] - Instance registry, update scheduler, shared context
//! - [`reconcile`] - Creation, diffing and the keyed list differ
//! - [`pipeline`] - Mount surface and host loop

pub mod config;
pub mod dom;
pub(crate) mod engine;
pub mod error;
pub mod pipeline;
pub mod primitives;
pub mod reconcile;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::{EngineConfig, MoveStrategy};

pub use dom::{Document, MarkupNode};

pub use error::{Error, Result};

pub use pipeline::Runtime;

pub use primitives::{Binding, ClassList, Component, Elementable, Handler, Producer, Scope, Setter, Template};

pub use reconcile::{KeyedPlan, PendingMounts};
