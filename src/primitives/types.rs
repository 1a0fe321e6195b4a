//! Template types - Plain data describing a desired node.
//!
//! A [`Template`] has no behaviour of its own. The reconciler reads it to
//! build or patch a live element.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::component::Elementable;
use super::scope::Scope;
use crate::types::{Event, Key, MOUNT_EVENT, NodeId};

// =============================================================================
// Callback Types
// =============================================================================

/// Event handler. Receives the call context of the nearest enclosing
/// component (with `target()` set to the concrete node) and the event.
pub type Handler = Rc<dyn Fn(&Scope, &Event)>;

// =============================================================================
// Class List
// =============================================================================

/// The three accepted shapes of `class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassList {
    /// Whitespace-separated class string. Replaces the class list.
    Text(String),
    /// Ordered class names. Replaces the class list.
    List(Vec<String>),
    /// Name -> enabled. Adds enabled classes and removes disabled ones,
    /// leaving unmentioned classes alone when patching.
    Toggles(Vec<(String, bool)>),
}

impl From<&str> for ClassList {
    fn from(value: &str) -> Self {
        ClassList::Text(value.to_string())
    }
}

impl From<String> for ClassList {
    fn from(value: String) -> Self {
        ClassList::Text(value)
    }
}

impl From<Vec<String>> for ClassList {
    fn from(value: Vec<String>) -> Self {
        ClassList::List(value)
    }
}

impl From<Vec<&str>> for ClassList {
    fn from(value: Vec<&str>) -> Self {
        ClassList::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<(&str, bool)>> for ClassList {
    fn from(value: Vec<(&str, bool)>) -> Self {
        ClassList::Toggles(value.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

// =============================================================================
// Template
// =============================================================================

/// Description of a single presentation node.
///
/// # Example
///
/// ```
/// use spark_dom::Template;
///
/// let item = Template::new("li")
///     .class("item")
///     .attr("title", "first")
///     .key("a")
///     .child("hello");
/// assert_eq!(item.tag.as_deref(), Some("li"));
/// ```
#[derive(Clone, Default)]
pub struct Template {
    /// Tag name. `None` means the configured default tag.
    pub tag: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub class: Option<ClassList>,
    /// Style property -> value. An empty value removes the property.
    pub style: BTreeMap<String, String>,
    /// Custom data keys. An empty value removes the key.
    pub dataset: BTreeMap<String, String>,
    /// Event name -> handler. `mount` is a post-attach callback.
    pub on: Vec<(String, Handler)>,
    pub children: Vec<Elementable>,
    pub key: Option<Key>,
    pub binding: Option<String>,
    /// Raw HTML content. When present, `children` is ignored.
    pub raw_html: Option<String>,
    /// Deep-clone this live node instead of building. Overrides everything.
    pub clone_from: Option<NodeId>,
}

impl Template {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.insert(name.into(), value.to_string());
        self
    }

    pub fn class(mut self, class: impl Into<ClassList>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(property.into(), value.into());
        self
    }

    pub fn data(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.dataset.insert(key.into(), value.to_string());
        self
    }

    /// Attach a handler. Registering the same event twice replaces the first.
    pub fn on(mut self, event: impl Into<String>, handler: impl Fn(&Scope, &Event) + 'static) -> Self {
        let event = event.into();
        self.on.retain(|(name, _)| *name != event);
        self.on.push((event, Rc::new(handler)));
        self
    }

    /// Post-attach callback, run once after the node is first connected.
    pub fn on_mount(self, handler: impl Fn(&Scope) + 'static) -> Self {
        self.on(MOUNT_EVENT, move |scope, _| handler(scope))
    }

    pub fn child(mut self, child: impl Into<Elementable>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, E>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Elementable>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn binding(mut self, name: impl Into<String>) -> Self {
        self.binding = Some(name.into());
        self
    }

    pub fn raw_html(mut self, html: impl Into<String>) -> Self {
        self.raw_html = Some(html.into());
        self
    }

    pub fn clone_from(mut self, node: NodeId) -> Self {
        self.clone_from = Some(node);
        self
    }

    /// Resolved tag name.
    pub fn tag_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.tag.as_deref().unwrap_or(default)
    }

    pub(crate) fn handler(&self, event: &str) -> Option<&Handler> {
        self.on.iter().find(|(name, _)| name == event).map(|(_, h)| h)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("tag", &self.tag)
            .field("attributes", &self.attributes)
            .field("class", &self.class)
            .field("style", &self.style)
            .field("dataset", &self.dataset)
            .field("on", &self.on.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .field("children", &self.children)
            .field("key", &self.key)
            .field("binding", &self.binding)
            .field("raw_html", &self.raw_html)
            .field("clone_from", &self.clone_from)
            .finish()
    }
}
