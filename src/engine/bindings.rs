//! Binding lookup - locating a named subtree in a fresh template and in the
//! live tree.
//!
//! Both searches exclude the starting node and stop at component boundaries:
//! a binding belongs to the nearest enclosing component only.

use super::registry::Registry;
use crate::dom::Document;
use crate::primitives::{Elementable, Template};
use crate::types::NodeId;

/// First descendant description carrying `name`, depth first.
pub(crate) fn find_subtemplate<'t>(template: &'t Template, name: &str) -> Option<&'t Elementable> {
    for child in &template.children {
        if child.binding() == Some(name) {
            return Some(child);
        }
        if let Elementable::Template(inner) = child {
            if inner.raw_html.is_none() {
                if let Some(found) = find_subtemplate(inner, name) {
                    return Some(found);
                }
            }
        }
    }
    None
}

/// First live descendant of `root` whose identity carries `name`.
pub(crate) fn find_subnode(
    doc: &Document,
    registry: &Registry,
    root: NodeId,
    name: &str,
) -> Option<NodeId> {
    for &child in doc.children(root) {
        let Some(node) = doc.get(child) else { continue };
        if node.is_text() {
            continue;
        }
        if node.identity.binding.as_deref() == Some(name) {
            return Some(child);
        }
        if registry.instance_at(child).is_some() {
            continue;
        }
        if let Some(found) = find_subnode(doc, registry, child, name) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Component;

    #[test]
    fn test_subtemplate_deep_match() {
        let template = Template::new("section")
            .child(Template::new("header").child(Template::new("h1").binding("title")))
            .child(Template::new("p").binding("body"));

        let found = find_subtemplate(&template, "title").unwrap();
        assert!(matches!(found, Elementable::Template(t) if t.tag.as_deref() == Some("h1")));
        assert!(find_subtemplate(&template, "body").is_some());
        assert!(find_subtemplate(&template, "missing").is_none());
    }

    #[test]
    fn test_subtemplate_excludes_root_and_stops_at_components() {
        let template = Template::new("div")
            .binding("root")
            .child(Component::new(|_| Template::new("span").binding("inner")).binding("child"));

        assert!(find_subtemplate(&template, "root").is_none());
        assert!(find_subtemplate(&template, "child").is_some());
        assert!(find_subtemplate(&template, "inner").is_none());
    }

    #[test]
    fn test_subnode_stops_at_instance_roots() {
        let mut doc = Document::default();
        let mut registry = Registry::default();
        let root = doc.create_element("div");
        let nested = doc.create_element("div");
        let inner = doc.create_element("span");
        let bound = doc.create_element("p");
        doc.append_child(root, nested).unwrap();
        doc.append_child(nested, inner).unwrap();
        doc.append_child(root, bound).unwrap();
        doc.node_mut(inner).unwrap().identity.binding = Some("inner".into());
        doc.node_mut(bound).unwrap().identity.binding = Some("p".into());

        assert_eq!(find_subnode(&doc, &registry, root, "inner"), Some(inner));

        let id = registry.allocate(&Component::new(|_| Template::default()), Box::new(()));
        registry.attach(id, nested);
        assert_eq!(find_subnode(&doc, &registry, root, "inner"), None);
        assert_eq!(find_subnode(&doc, &registry, root, "p"), Some(bound));
    }
}
