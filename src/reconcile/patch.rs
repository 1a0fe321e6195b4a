//! In-place element patching.
//!
//! Each helper reports whether it changed anything; `patch_element` folds
//! those into [`PatchFlags`]. Creation runs the same helpers on a blank
//! element, so built and patched nodes cannot drift apart.

use std::collections::BTreeMap;

use tracing::trace;

use crate::dom::{Document, Element, Identity, Listener};
use crate::error::Result;
use crate::primitives::{ClassList, Handler, Template};
use crate::types::{InstanceId, MOUNT_EVENT, NodeId, PatchFlags};

/// Apply a class description. Text and lists replace the class list;
/// toggles add or remove individual classes.
pub(crate) fn apply_class(el: &mut Element, class: &ClassList) -> bool {
    let replace_with = |el: &mut Element, names: Vec<String>| {
        let mut unique: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            if !name.is_empty() && !unique.contains(&name) {
                unique.push(name);
            }
        }
        if el.classes == unique {
            return false;
        }
        el.classes = unique;
        true
    };
    match class {
        ClassList::Text(text) => {
            replace_with(el, text.split_whitespace().map(str::to_string).collect())
        }
        ClassList::List(names) => replace_with(el, names.clone()),
        ClassList::Toggles(toggles) => {
            let mut changed = false;
            for (name, enabled) in toggles {
                changed |= if *enabled {
                    el.add_class(name)
                } else {
                    el.remove_class(name)
                };
            }
            changed
        }
    }
}

/// Merge `desired` into `target`. Empty values delete the entry; entries not
/// mentioned are kept.
pub(crate) fn apply_map(target: &mut BTreeMap<String, String>, desired: &BTreeMap<String, String>) -> bool {
    let mut changed = false;
    for (key, value) in desired {
        if value.is_empty() {
            changed |= target.remove(key).is_some();
        } else if target.get(key) != Some(value) {
            target.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

/// Make `target` equal to `desired`: stale attributes are removed.
pub(crate) fn sync_attributes(target: &mut BTreeMap<String, String>, desired: &BTreeMap<String, String>) -> bool {
    if target == desired {
        return false;
    }
    *target = desired.clone();
    true
}

/// Replace the element's listeners. `mount` never becomes a listener.
pub(crate) fn set_listeners(el: &mut Element, on: &[(String, Handler)], scope: Option<InstanceId>) -> bool {
    let listeners: Vec<Listener> = on
        .iter()
        .filter(|(event, _)| event != MOUNT_EVENT)
        .map(|(event, handler)| Listener {
            event: event.clone(),
            handler: handler.clone(),
            scope,
        })
        .collect();
    let changed = !(el.listeners.is_empty() && listeners.is_empty());
    el.listeners = listeners;
    changed
}

/// Bring a live element in line with `template`, children excluded.
pub(crate) fn patch_element(
    doc: &mut Document,
    node: NodeId,
    template: &Template,
    scope: Option<InstanceId>,
) -> Result<PatchFlags> {
    let mut flags = PatchFlags::empty();
    let el = doc.element_mut(node)?;
    if let Some(class) = &template.class {
        flags.set(PatchFlags::CLASS, apply_class(el, class));
    }
    flags.set(PatchFlags::STYLE, apply_map(&mut el.style, &template.style));
    flags.set(PatchFlags::DATASET, apply_map(&mut el.dataset, &template.dataset));
    flags.set(
        PatchFlags::ATTRIBUTES,
        sync_attributes(&mut el.attributes, &template.attributes),
    );
    flags.set(PatchFlags::LISTENERS, set_listeners(el, &template.on, scope));

    let identity = Identity {
        key: template.key.clone(),
        binding: template.binding.clone(),
    };
    let live = doc.node_mut(node)?;
    if live.identity != identity {
        live.identity = identity;
        flags |= PatchFlags::IDENTITY;
    }

    if !flags.is_empty() {
        trace!(%node, ?flags, "patched");
    }
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_class_text_replaces() {
        let mut el = Element::new("div");
        el.classes = vec!["old".into()];
        assert!(apply_class(&mut el, &ClassList::from("a  b a")));
        assert_eq!(el.classes, vec!["a", "b"]);
        assert!(!apply_class(&mut el, &ClassList::from(vec!["a", "b"])));
    }

    #[test]
    fn test_class_toggles_leave_others() {
        let mut el = Element::new("div");
        el.classes = vec!["keep".into(), "off".into()];
        let toggles = ClassList::from(vec![("on", true), ("off", false)]);
        assert!(apply_class(&mut el, &toggles));
        assert_eq!(el.classes, vec!["keep", "on"]);
        assert!(!apply_class(&mut el, &toggles));
    }

    #[test]
    fn test_map_merge_and_delete() {
        let mut style = map(&[("color", "red"), ("margin", "0")]);
        assert!(apply_map(&mut style, &map(&[("color", "blue"), ("margin", "")])));
        assert_eq!(style, map(&[("color", "blue")]));
        assert!(!apply_map(&mut style, &map(&[("color", "blue")])));
    }

    #[test]
    fn test_attributes_fully_synced() {
        let mut attrs = map(&[("href", "/a"), ("title", "x")]);
        assert!(sync_attributes(&mut attrs, &map(&[("href", "/b")])));
        assert_eq!(attrs, map(&[("href", "/b")]));
    }

    #[test]
    fn test_mount_is_not_a_listener() {
        let mut el = Element::new("button");
        let handler: Handler = Rc::new(|_, _| {});
        let on = vec![("click".to_string(), handler.clone()), (MOUNT_EVENT.to_string(), handler)];
        assert!(set_listeners(&mut el, &on, None));
        assert_eq!(el.listeners.len(), 1);
        assert_eq!(el.listeners[0].event, "click");
    }

    #[test]
    fn test_patch_flags_reported() {
        let mut doc = Document::default();
        let node = doc.create_element("div");
        let template = Template::new("div").class("a").key("k");

        let flags = patch_element(&mut doc, node, &template, None).unwrap();
        assert_eq!(flags, PatchFlags::CLASS | PatchFlags::IDENTITY);
        assert_eq!(doc.key(node).map(|k| k.as_str()), Some("k"));

        let flags = patch_element(&mut doc, node, &template, None).unwrap();
        assert!(flags.is_empty());
    }
}
