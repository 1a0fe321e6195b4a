//! Primitives - the descriptions the engine consumes.
//!
//! - [`Template`] - plain data describing one node
//! - [`Component`] - stateful producer of a template
//! - [`Elementable`] - template, component or primitive value
//! - [`Scope`] - call context passed to producers and handlers
//!
//! # Shape
//!
//! ```ignore
//! let list = Template::new("ul").children(items.iter().map(|item| {
//!     Template::new("li").key(item.id).child(&item.label)
//! }));
//! ```
//!
//! Keys on every sibling opt the list into keyed reconciliation. A
//! `binding` name makes the subtree reachable from the enclosing component.

mod component;
mod scope;
mod types;

pub use component::*;
pub use scope::*;
pub use types::*;
