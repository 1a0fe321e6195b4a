//! Mount handlers, event handlers and bindings driven through the runtime.

use std::cell::RefCell;
use std::rc::Rc;

use spark_dom::{Component, Event, Runtime, Template};

type Log = Rc<RefCell<Vec<String>>>;

fn logger(log: &Log, name: &'static str) -> impl Fn(&spark_dom::Scope) + 'static {
    let log = log.clone();
    move |cx| {
        let connected = cx
            .with_document(|doc| cx.target().is_some_and(|node| doc.is_connected(node)))
            .unwrap_or(false);
        log.borrow_mut().push(format!("{name}:{connected}"));
    }
}

#[test]
fn test_mount_order_parent_first() {
    let rt = Runtime::new();
    let log: Log = Rc::default();
    let tree = Template::new("div")
        .on_mount(logger(&log, "outer"))
        .child(Template::new("span").on_mount(logger(&log, "first")))
        .child(Template::new("span").on_mount(logger(&log, "second")));

    rt.append_child(rt.root(), tree).unwrap();

    assert_eq!(*log.borrow(), vec!["outer:true", "first:true", "second:true"]);
}

#[test]
fn test_mount_runs_only_for_new_nodes() {
    let rt = Runtime::new();
    let log: Log = Rc::default();
    let log_in = log.clone();
    let list = Component::new(move |cx| {
        let n = cx.state::<usize>().unwrap_or_default();
        let log = log_in.clone();
        Template::new("ul").children((0..n).map(move |i| {
            let log = log.clone();
            Template::new("li")
                .key(i)
                .child(i)
                .on_mount(move |_| log.borrow_mut().push(format!("li{i}")))
        }))
    })
    .with_initial_state(1usize);
    let ul = rt.append_child(rt.root(), list).unwrap();
    let id = rt.instance_of(ul).unwrap();
    assert_eq!(*log.borrow(), vec!["li0"]);

    rt.scope(id).unwrap().set_state(2usize);
    rt.flush();
    assert_eq!(*log.borrow(), vec!["li0", "li1"]);

    // Patching an existing node never re-runs its mount handler
    rt.scope(id).unwrap().set_state(2usize);
    rt.flush();
    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn test_click_counter_updates_after_dispatch() {
    let rt = Runtime::new();
    let button = Component::new(|cx| {
        let n = cx.state::<u32>().unwrap_or_default();
        let set = cx.setter(|count: &mut u32, value: u32| *count = value);
        Template::new("button")
            .on("click", move |_, _| {
                set.set(n + 1);
            })
            .child(n)
    })
    .with_initial_state(0u32);
    let node = rt.append_child(rt.root(), button).unwrap();

    assert_eq!(rt.dispatch(node, &Event::new("click")).unwrap(), 1);
    assert_eq!(rt.markup(node).unwrap(), "<button>1</button>");
    assert!(!rt.has_pending());

    rt.dispatch(node, &Event::new("click")).unwrap();
    assert_eq!(rt.markup(node).unwrap(), "<button>2</button>");
}

#[test]
fn test_input_value_reaches_handler() {
    let rt = Runtime::new();
    let field = Component::new(|cx| {
        let text = cx.state::<String>().unwrap_or_default();
        let set = cx.setter(|s: &mut String, value: String| *s = value);
        Template::new("label")
            .child(Template::new("input").on("input", move |_, event| {
                if let Some(value) = &event.value {
                    set.set(value.clone());
                }
            }))
            .child(text)
    })
    .with_initial_state(String::new());
    let label = rt.append_child(rt.root(), field).unwrap();
    let input = rt.with_document(|doc| doc.element_children(label)[0]);

    rt.dispatch(input, &Event::with_value("input", "hi")).unwrap();

    assert_eq!(rt.markup(label).unwrap(), "<label><input>hi</label>");
}

#[test]
fn test_synchronous_rerender_from_handler() {
    let rt = Runtime::new();
    let seen: Rc<RefCell<Option<String>>> = Rc::default();
    let seen_in = seen.clone();
    let panel = Component::new(move |cx| {
        let open = cx.state::<bool>().unwrap_or_default();
        let seen = seen_in.clone();
        Template::new("details")
            .on("toggle", move |cx, _| {
                cx.set_state(true);
                cx.rerender();
                // Visible before the checkpoint
                let node = cx.node();
                *seen.borrow_mut() = cx
                    .with_document(|doc| node.map(|n| doc.text_content(n)))
                    .flatten();
            })
            .child(if open { "open" } else { "closed" })
    })
    .with_initial_state(false);
    let node = rt.append_child(rt.root(), panel).unwrap();

    rt.dispatch(node, &Event::new("toggle")).unwrap();

    assert_eq!(seen.borrow().as_deref(), Some("open"));
    assert_eq!(rt.markup(node).unwrap(), "<details>open</details>");
}

#[test]
fn test_binding_rerender_from_handler() {
    let rt = Runtime::new();
    let card = Component::new(|cx| {
        let clicks = cx.state::<u32>().unwrap_or_default();
        Template::new("article")
            .child(Template::new("h2").binding("heading").child("Clicks"))
            .child(
                Template::new("span")
                    .binding("count")
                    .child(clicks)
                    .on("click", |cx, _| {
                        cx.update(|n: &mut u32| *n += 1);
                        if let Some(binding) = cx.binding("count") {
                            binding.rerender();
                        }
                    }),
            )
    })
    .with_initial_state(0u32);
    let article = rt.append_child(rt.root(), card).unwrap();
    let id = rt.instance_of(article).unwrap();
    let span = rt.binding(id, "count").unwrap().node();
    let renders = rt.render_count(id).unwrap();

    rt.dispatch(span, &Event::new("click")).unwrap();

    // One producer run for the binding, one for the queued update
    assert_eq!(rt.render_count(id), Some(renders + 2));
    assert_eq!(rt.markup(span).unwrap(), "<span>1</span>");
    assert_eq!(rt.binding(id, "count").unwrap().node(), span);
    assert!(rt.binding(id, "missing").is_none());
}

#[test]
fn test_replace_with_component_mounts_replacement() {
    let rt = Runtime::new();
    let log: Log = Rc::default();
    let old = rt.append_child(rt.root(), Template::new("p").child("old")).unwrap();
    let replacement = Template::new("section").on_mount(logger(&log, "section"));

    let new = rt.replace_with(old, replacement).unwrap();

    assert!(rt.with_document(|doc| !doc.contains(old)));
    assert_eq!(rt.with_document(|doc| doc.children(doc.root()).to_vec()), vec![new]);
    assert_eq!(*log.borrow(), vec!["section:true"]);
}
