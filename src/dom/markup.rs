//! Markup - HTML serialization and raw fragment parsing.
//!
//! Raw HTML handed to a template is parsed with `html_parser` into
//! [`MarkupNode`]s, a canonical shape shared with snapshots of live subtrees.
//! Two fragments are structurally equal exactly when their `MarkupNode`
//! vectors compare equal.

use std::collections::BTreeMap;
use std::fmt::Write;

use super::document::{Document, NodeData};
use crate::error::{Error, Result};
use crate::types::NodeId;

/// Elements that never have children or a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Canonical, comparable markup tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        classes: Vec<String>,
        children: Vec<MarkupNode>,
    },
    Text(String),
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse an HTML fragment. Comments are dropped.
pub fn parse_fragment(raw: &str) -> Result<Vec<MarkupNode>> {
    let dom = html_parser::Dom::parse(raw).map_err(|e| Error::markup(e.to_string()))?;
    Ok(dom.children.iter().filter_map(convert).collect())
}

fn convert(node: &html_parser::Node) -> Option<MarkupNode> {
    match node {
        html_parser::Node::Text(text) => Some(MarkupNode::Text(text.clone())),
        html_parser::Node::Comment(_) => None,
        html_parser::Node::Element(el) => {
            let mut attributes: BTreeMap<String, String> = el
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone().unwrap_or_default()))
                .collect();
            if let Some(id) = &el.id {
                attributes.insert("id".to_string(), id.clone());
            }
            Some(MarkupNode::Element {
                tag: el.name.to_ascii_lowercase(),
                attributes,
                classes: el.classes.clone(),
                children: el.children.iter().filter_map(convert).collect(),
            })
        }
    }
}

/// Materialise parsed markup as detached live nodes.
pub fn build(doc: &mut Document, nodes: &[MarkupNode]) -> Result<Vec<NodeId>> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        let id = match node {
            MarkupNode::Text(text) => doc.create_text(text.clone()),
            MarkupNode::Element {
                tag,
                attributes,
                classes,
                children,
            } => {
                let id = doc.create_element(tag.clone());
                {
                    let el = doc.element_mut(id)?;
                    el.attributes = attributes.clone();
                    el.classes = classes.clone();
                }
                for child in build(doc, children)? {
                    doc.append_child(id, child)?;
                }
                id
            }
        };
        out.push(id);
    }
    Ok(out)
}

/// Canonical snapshot of a live node's children.
pub fn snapshot_children(doc: &Document, id: NodeId) -> Vec<MarkupNode> {
    doc.children(id)
        .iter()
        .filter_map(|&child| snapshot(doc, child))
        .collect()
}

/// Canonical snapshot of a live subtree. Style and dataset are folded into
/// attributes the way a host serializer would expose them.
pub fn snapshot(doc: &Document, id: NodeId) -> Option<MarkupNode> {
    let node = doc.get(id)?;
    Some(match &node.data {
        NodeData::Text(text) => MarkupNode::Text(text.clone()),
        NodeData::Element(el) => {
            let mut attributes = el.attributes.clone();
            if !el.style.is_empty() {
                attributes.insert("style".to_string(), style_text(&el.style));
            }
            for (k, v) in &el.dataset {
                attributes.insert(format!("data-{}", dataset_attr_name(k)), v.clone());
            }
            MarkupNode::Element {
                tag: el.tag.clone(),
                attributes,
                classes: el.classes.clone(),
                children: snapshot_children(doc, id),
            }
        }
    })
}

// =============================================================================
// Serialization
// =============================================================================

/// Serialize a live subtree to HTML.
pub fn to_markup(doc: &Document, id: NodeId) -> Option<String> {
    let node = snapshot(doc, id)?;
    let mut out = String::new();
    write_node(&mut out, &node);
    Some(out)
}

/// Serialize only the children of a live node.
pub fn inner_markup(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    for node in snapshot_children(doc, id) {
        write_node(&mut out, &node);
    }
    out
}

fn write_node(out: &mut String, node: &MarkupNode) {
    match node {
        MarkupNode::Text(text) => out.push_str(&escape(text, false)),
        MarkupNode::Element {
            tag,
            attributes,
            classes,
            children,
        } => {
            let _ = write!(out, "<{tag}");
            if !classes.is_empty() {
                let _ = write!(out, " class=\"{}\"", escape(&classes.join(" "), true));
            }
            for (name, value) in attributes {
                let _ = write!(out, " {name}=\"{}\"", escape(value, true));
            }
            out.push('>');
            if VOID_TAGS.contains(&tag.as_str()) && children.is_empty() {
                return;
            }
            for child in children {
                write_node(out, child);
            }
            let _ = write!(out, "</{tag}>");
        }
    }
}

fn style_text(style: &BTreeMap<String, String>) -> String {
    style
        .iter()
        .map(|(k, v)| format!("{k}: {v};"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `userId` -> `user-id`, the dataset-to-attribute mapping.
fn dataset_attr_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 2);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_nested() {
        let mut doc = Document::default();
        let ul = doc.create_element("ul");
        doc.element_mut(ul).unwrap().add_class("list");
        let li = doc.create_element("li");
        doc.element_mut(li)
            .unwrap()
            .attributes
            .insert("title".into(), "a \"b\"".into());
        let text = doc.create_text("1 < 2");
        doc.append_child(ul, li).unwrap();
        doc.append_child(li, text).unwrap();

        assert_eq!(
            to_markup(&doc, ul).unwrap(),
            r#"<ul class="list"><li title="a &quot;b&quot;">1 &lt; 2</li></ul>"#
        );
    }

    #[test]
    fn test_style_and_dataset_serialized() {
        let mut doc = Document::default();
        let div = doc.create_element("div");
        {
            let el = doc.element_mut(div).unwrap();
            el.style.insert("color".into(), "red".into());
            el.dataset.insert("userId".into(), "7".into());
        }
        assert_eq!(
            to_markup(&doc, div).unwrap(),
            r#"<div data-user-id="7" style="color: red;"></div>"#
        );
    }

    #[test]
    fn test_inner_markup_skips_host() {
        let mut doc = Document::default();
        let p = doc.create_element("p");
        let b = doc.create_element("b");
        let hello = doc.create_text("hi ");
        let name = doc.create_text("Ann");
        doc.append_child(p, hello).unwrap();
        doc.append_child(p, b).unwrap();
        doc.append_child(b, name).unwrap();

        assert_eq!(inner_markup(&doc, p), "hi <b>Ann</b>");
        assert_eq!(inner_markup(&doc, name), "");
    }

    #[test]
    fn test_void_elements() {
        let mut doc = Document::default();
        let br = doc.create_element("br");
        assert_eq!(to_markup(&doc, br).unwrap(), "<br>");
    }

    #[test]
    fn test_parse_and_build_roundtrip_equal() {
        let parsed = parse_fragment(r#"<p class="a b" id="x">hello <b>world</b></p>"#).unwrap();
        let mut doc = Document::default();
        let host = doc.create_element("div");
        for node in build(&mut doc, &parsed).unwrap() {
            doc.append_child(host, node).unwrap();
        }
        assert_eq!(snapshot_children(&doc, host), parsed);
        let p = doc.children(host)[0];
        assert_eq!(doc.element(p).unwrap().attributes.get("id").map(String::as_str), Some("x"));
        assert_eq!(doc.element(p).unwrap().classes, vec!["a", "b"]);
    }

    #[test]
    fn test_structural_difference_detected() {
        let a = parse_fragment("<p>one</p>").unwrap();
        let b = parse_fragment("<p>two</p>").unwrap();
        assert_ne!(a, b);
    }
}
