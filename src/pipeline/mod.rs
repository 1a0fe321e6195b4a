//! Pipeline - the mount surface and host loop.
//!
//! # Pipeline Architecture
//!
//! ```text
//! description -> create -> attach -> mount handlers
//! event -> dispatch -> handlers -> setters enqueue -> flush -> reconcile
//! ```
//!
//! ## Key Design Principles
//!
//! - **Deferred updates**: setters never render; the checkpoint does
//! - **Attach before mount**: `mount` handlers see a connected subtree

pub mod mount;

pub use mount::Runtime;
