//! Live presentation tree.
//!
//! - Document: arena of element and text nodes with a permanent root
//! - Markup: canonical HTML serialization and raw fragment parsing

mod document;
pub mod markup;

pub use document::*;
pub use markup::{MarkupNode, inner_markup, parse_fragment, to_markup};
