//! Document - Arena-backed live presentation tree.
//!
//! Every live node is a slot in one `Vec`. Freed slots go to a free pool for
//! O(1) reuse and get their generation bumped, so handles to freed nodes go
//! stale instead of aliasing new nodes.
//!
//! ```text
//! slot 0: <body>        parent=None  children=[1, 3]
//! slot 1: <ul>          parent=0     children=[2]
//! slot 2: "hello"       parent=1
//! slot 3: <p>           parent=0
//! ```

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::primitives::Handler;
use crate::types::{InstanceId, Key, NodeId};

// =============================================================================
// Node Types
// =============================================================================

/// An event listener attached to an element.
///
/// The handler is stored together with the instance whose scope it should
/// receive when invoked, so dispatch can build the call context lazily.
#[derive(Clone)]
pub struct Listener {
    pub event: String,
    pub handler: Handler,
    pub scope: Option<InstanceId>,
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("event", &self.event)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Element payload.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// Ordered class list (the element's `className`, split).
    pub classes: Vec<String>,
    pub style: BTreeMap<String, String>,
    pub dataset: BTreeMap<String, String>,
    pub listeners: Vec<Listener>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) -> bool {
        if self.has_class(class) {
            return false;
        }
        self.classes.push(class.to_string());
        true
    }

    pub fn remove_class(&mut self, class: &str) -> bool {
        let before = self.classes.len();
        self.classes.retain(|c| c != class);
        before != self.classes.len()
    }

    /// Space-joined class list.
    pub fn class_name(&self) -> String {
        self.classes.join(" ")
    }
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeData {
    Element(Element),
    Text(String),
}

/// Engine identity tokens for a node. Never rendered as attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub key: Option<Key>,
    pub binding: Option<String>,
}

/// A live node.
#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub data: NodeData,
    pub identity: Identity,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    pub fn element(&self) -> Option<&Element> {
        match &self.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(text) => Some(text),
            NodeData::Element(_) => None,
        }
    }
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Allocation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocStats {
    /// Nodes ever allocated (including clones and the root).
    pub created: u64,
    /// Nodes ever freed.
    pub freed: u64,
}

// =============================================================================
// Document
// =============================================================================

/// The live presentation tree.
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    stats: DocStats,
}

impl Document {
    /// Create a document with a permanent root element.
    pub fn new(root_tag: &str) -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId::new(0, 0),
            stats: DocStats::default(),
        };
        doc.root = doc.alloc(NodeData::Element(Element::new(root_tag)));
        doc
    }

    /// The permanent root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn stats(&self) -> DocStats {
        self.stats
    }

    /// Number of live nodes (attached or not), root included.
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            parent: None,
            children: Vec::new(),
            data,
            identity: Identity::default(),
        };
        self.stats.created += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId::new(index, 0)
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Element(Element::new(tag)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(text.into()))
    }

    /// Free a detached node and all its descendants. Returns the freed ids in
    /// pre-order.
    pub fn free_subtree(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        if id == self.root {
            return Err(Error::RootNode(id));
        }
        if self.node(id)?.parent.is_some() {
            self.detach(id)?;
        }
        let ids = self.descendants(id)?;
        for &node in &ids {
            let slot = &mut self.slots[node.index as usize];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node.index);
            self.stats.freed += 1;
        }
        Ok(ids)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id).ok_or(Error::StaleNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.get_mut(id).ok_or(Error::StaleNode(id))
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.get(id).and_then(Node::element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Result<&mut Element> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(el) => Ok(el),
            NodeData::Text(_) => Err(Error::NotAnElement(id)),
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(Node::text)
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<()> {
        match &mut self.node_mut(id)?.data {
            NodeData::Text(content) => {
                *content = text.into();
                Ok(())
            }
            NodeData::Element(_) => Err(Error::NotAnElement(id)),
        }
    }

    pub fn identity(&self, id: NodeId) -> Option<&Identity> {
        self.get(id).map(|n| &n.identity)
    }

    pub fn key(&self, id: NodeId) -> Option<&Key> {
        self.get(id).and_then(|n| n.identity.key.as_ref())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Child handles, empty for stale ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Element children only, in order.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.element(c).is_some())
            .collect()
    }

    /// `id` and all its descendants in pre-order.
    pub fn descendants(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.node(id)?;
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        Ok(out)
    }

    pub fn is_ancestor(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        while let Some(parent) = self.parent(id) {
            if parent == ancestor {
                return true;
            }
            id = parent;
        }
        false
    }

    /// Whether the node hangs off the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == self.root || (self.contains(id) && self.is_ancestor(self.root, id))
    }

    /// Connected elements matching `predicate`, in document order.
    pub fn query_all(&self, predicate: impl Fn(&Element) -> bool) -> Vec<NodeId> {
        self.descendants(self.root)
            .unwrap_or_default()
            .into_iter()
            .filter(|&id| self.element(id).is_some_and(&predicate))
            .collect()
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Ok(ids) = self.descendants(id) {
            for node in ids {
                if let Some(text) = self.text(node) {
                    out.push_str(text);
                }
            }
        }
        out
    }

    // =========================================================================
    // Structure
    // =========================================================================

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.node(parent)?.is_text() {
            return Err(Error::NotAnElement(parent));
        }
        self.node(child)?;
        if child == self.root || child == parent || self.is_ancestor(child, parent) {
            return Err(Error::CycleDetected(child));
        }
        Ok(())
    }

    /// Remove `id` from its parent's child list. No-op when already detached.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            if let Some(p) = self.get_mut(parent) {
                p.children.retain(|&c| c != id);
            }
            self.node_mut(id)?.parent = None;
        }
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference`, or at the end when `reference` is
    /// `None`. The child is detached from any previous parent first.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        self.check_insertable(parent, child)?;
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) || reference == child {
                return Err(Error::NotAChild {
                    parent,
                    child: reference,
                });
            }
        }
        self.detach(child)?;
        let position = match reference {
            Some(reference) => self
                .children(parent)
                .iter()
                .position(|&c| c == reference)
                .ok_or(Error::NotAChild {
                    parent,
                    child: reference,
                })?,
            None => self.children(parent).len(),
        };
        self.node_mut(parent)?.children.insert(position, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Put `new` where `old` is. `old` ends up detached but still allocated.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        if old == self.root {
            return Err(Error::RootNode(old));
        }
        let parent = self.node(old)?.parent.ok_or(Error::Detached(old))?;
        if old == new {
            return Ok(());
        }
        self.insert_before(parent, new, Some(old))?;
        self.detach(old)
    }

    /// Deep-clone a subtree into a new detached subtree. Listeners and engine
    /// identity are not cloned.
    pub fn deep_clone(&mut self, id: NodeId) -> Result<NodeId> {
        let data = match &self.node(id)?.data {
            NodeData::Element(el) => NodeData::Element(Element {
                listeners: Vec::new(),
                ..el.clone()
            }),
            NodeData::Text(text) => NodeData::Text(text.clone()),
        };
        let copy = self.alloc(data);
        let children = self.children(id).to_vec();
        for child in children {
            let child_copy = self.deep_clone(child)?;
            self.append_child(copy, child_copy)?;
        }
        Ok(copy)
    }

    /// Structural equality of two subtrees: tags, attributes, classes, style,
    /// dataset and text. Listeners and identity are ignored.
    pub fn is_equal_node(&self, a: NodeId, b: NodeId) -> bool {
        let (Some(na), Some(nb)) = (self.get(a), self.get(b)) else {
            return false;
        };
        let same_data = match (&na.data, &nb.data) {
            (NodeData::Text(x), NodeData::Text(y)) => x == y,
            (NodeData::Element(x), NodeData::Element(y)) => {
                x.tag == y.tag
                    && x.attributes == y.attributes
                    && x.classes == y.classes
                    && x.style == y.style
                    && x.dataset == y.dataset
            }
            _ => false,
        };
        same_data
            && na.children.len() == nb.children.len()
            && na
                .children
                .iter()
                .zip(nb.children.iter())
                .all(|(&x, &y)| self.is_equal_node(x, y))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("body")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_append() {
        let mut doc = Document::new("body");
        let root = doc.root();
        let ul = doc.create_element("ul");
        let text = doc.create_text("hi");

        doc.append_child(root, ul).unwrap();
        doc.append_child(ul, text).unwrap();

        assert_eq!(doc.children(root), &[ul]);
        assert_eq!(doc.parent(text), Some(ul));
        assert_eq!(doc.tag(ul), Some("ul"));
        assert_eq!(doc.text(text), Some("hi"));
        assert!(doc.is_connected(text));
    }

    #[test]
    fn test_insert_before_reference() {
        let mut doc = Document::default();
        let root = doc.root();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let c = doc.create_element("c");
        doc.append_child(root, a).unwrap();
        doc.append_child(root, c).unwrap();
        doc.insert_before(root, b, Some(c)).unwrap();
        assert_eq!(doc.children(root), &[a, b, c]);

        // Moving an attached node keeps a single copy
        doc.insert_before(root, c, Some(a)).unwrap();
        assert_eq!(doc.children(root), &[c, a, b]);
    }

    #[test]
    fn test_insert_before_foreign_reference_fails() {
        let mut doc = Document::default();
        let root = doc.root();
        let a = doc.create_element("a");
        let stray = doc.create_element("b");
        let err = doc.insert_before(root, a, Some(stray)).unwrap_err();
        assert_eq!(err, Error::NotAChild { parent: root, child: stray });
    }

    #[test]
    fn test_cycle_rejected() {
        let mut doc = Document::default();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(outer, inner).unwrap();
        assert_eq!(doc.append_child(inner, outer), Err(Error::CycleDetected(outer)));
    }

    #[test]
    fn test_free_and_stale_handles() {
        let mut doc = Document::default();
        let root = doc.root();
        let a = doc.create_element("div");
        let child = doc.create_text("x");
        doc.append_child(root, a).unwrap();
        doc.append_child(a, child).unwrap();

        let freed = doc.free_subtree(a).unwrap();
        assert_eq!(freed, vec![a, child]);
        assert!(!doc.contains(a));
        assert!(doc.children(root).is_empty());

        // Slot reused with new generation
        let b = doc.create_element("span");
        assert_ne!(a, b);
        assert!(doc.get(a).is_none());
        assert_eq!(doc.stats().freed, 2);
    }

    #[test]
    fn test_node_count_includes_root() {
        let mut doc = Document::default();
        assert_eq!(doc.node_count(), 1);
        let div = doc.create_element("div");
        let text = doc.create_text("x");
        doc.append_child(div, text).unwrap();
        assert_eq!(doc.node_count(), 3);
        doc.free_subtree(div).unwrap();
        assert_eq!(doc.node_count(), 1);
    }

    #[test]
    fn test_replace() {
        let mut doc = Document::default();
        let root = doc.root();
        let old = doc.create_element("button");
        let new = doc.create_element("div");
        doc.append_child(root, old).unwrap();
        doc.replace(old, new).unwrap();
        assert_eq!(doc.children(root), &[new]);
        assert_eq!(doc.parent(old), None);
        assert!(doc.contains(old));
    }

    #[test]
    fn test_root_is_permanent() {
        let mut doc = Document::default();
        let root = doc.root();
        let other = doc.create_element("main");
        assert_eq!(doc.free_subtree(root), Err(Error::RootNode(root)));
        assert_eq!(doc.replace(root, other), Err(Error::RootNode(root)));
    }

    #[test]
    fn test_replace_detached_fails() {
        let mut doc = Document::default();
        let old = doc.create_element("p");
        let new = doc.create_element("p");
        assert_eq!(doc.replace(old, new), Err(Error::Detached(old)));
    }

    #[test]
    fn test_deep_clone_equal() {
        let mut doc = Document::default();
        let a = doc.create_element("p");
        doc.element_mut(a).unwrap().add_class("note");
        let t = doc.create_text("body");
        doc.append_child(a, t).unwrap();

        let copy = doc.deep_clone(a).unwrap();
        assert_ne!(copy, a);
        assert!(doc.is_equal_node(a, copy));

        doc.set_text(t, "changed").unwrap();
        assert!(!doc.is_equal_node(a, copy));
    }

    #[test]
    fn test_query_all_connected_only() {
        let mut doc = Document::default();
        let root = doc.root();
        let a = doc.create_element("section");
        let b = doc.create_element("section");
        let detached = doc.create_element("section");
        for id in [a, b, detached] {
            doc.element_mut(id).unwrap().dataset.insert("receivePageChanges".into(), "true".into());
        }
        doc.append_child(root, a).unwrap();
        doc.append_child(a, b).unwrap();

        let found = doc.query_all(|el| el.dataset.contains_key("receivePageChanges"));
        assert_eq!(found, vec![a, b]);
    }

    #[test]
    fn test_class_helpers() {
        let mut el = Element::new("div");
        assert!(el.add_class("a"));
        assert!(!el.add_class("a"));
        assert!(el.add_class("b"));
        assert_eq!(el.class_name(), "a b");
        assert!(el.remove_class("a"));
        assert_eq!(el.class_name(), "b");
    }
}
