//! Disposal tied to document connection: nested elements, idempotence,
//! reconnection.

use std::cell::RefCell;
use std::rc::Rc;

use spark_dom::engine::{behavior, children, create_custom_element, exists, is_connected};
use spark_dom::*;
use spark_signals::signal;

type Log = Rc<RefCell<Vec<String>>>;

/// Registers one disposer per connection and renders `child` (if any).
struct Panel {
    name: &'static str,
    log: Log,
    child: Option<NodeId>,
}

impl DisposingComponent for Panel {
    fn connected(&self, host: NodeId, registry: &DisposalRegistry) -> Result<()> {
        self.log.borrow_mut().push(format!("+{}", self.name));
        let log = self.log.clone();
        let name = self.name;
        registry.register_disposer(Box::new(move || log.borrow_mut().push(format!("-{name}"))));
        if let Some(child) = self.child {
            append_child(host, child)?;
        }
        Ok(())
    }
}

fn panel(name: &'static str, log: &Log, child: Option<NodeId>) -> NodeId {
    create_custom_element(
        "x-panel",
        Rc::new(DisposingElement::new(Panel {
            name,
            log: log.clone(),
            child,
        })),
    )
}

#[test]
fn test_nested_elements_both_dispose() {
    reset_document();
    let log: Log = Rc::default();

    let inner = panel("inner", &log, None);
    let outer = panel("outer", &log, Some(inner));
    append_child(body(), outer).unwrap();
    assert!(is_connected(inner));
    assert_eq!(*log.borrow(), vec!["+outer", "+inner"]);

    remove(outer).unwrap();
    assert_eq!(*log.borrow(), vec!["+outer", "+inner", "-outer", "-inner"]);
    assert!(children(outer).is_empty());
}

#[test]
fn test_disconnect_hook_twice_runs_disposers_once() {
    reset_document();
    let log: Log = Rc::default();

    let host = panel("p", &log, None);
    append_child(body(), host).unwrap();
    remove(host).unwrap();

    let hook = behavior(host).unwrap();
    hook.disconnected(host).unwrap();
    hook.disconnected(host).unwrap();
    assert_eq!(*log.borrow(), vec!["+p", "-p"]);
}

#[test]
fn test_owned_bindings_die_with_host() {
    reset_document();

    let count = signal(1);
    let registry = DisposalRegistry::new();
    let count_clone = count.clone();
    let label = h(
        Tag::text_node(),
        vec![Attr::obs_prop(
            "data",
            Binding::owned(&registry, move || format!("{} item left", count_clone.get())),
        )],
        (),
    )
    .unwrap();

    count.set(2);
    assert_eq!(engine::text(label).as_deref(), Some("2 item left"));

    registry.dispose();
    count.set(3);
    assert_eq!(engine::text(label).as_deref(), Some("2 item left"));
}

#[test]
fn test_released_host_drops_listeners() {
    reset_document();

    let button = h("button", vec![Attr::on("click", |_| {})], ()).unwrap();
    assert_eq!(state::listener_count(button), 1);

    release(button).unwrap();
    assert_eq!(state::listener_count(button), 0);
}

#[test]
fn test_removed_content_is_freed_on_flush() {
    reset_document();
    let log: Log = Rc::default();

    let inner = panel("inner", &log, None);
    let outer = panel("outer", &log, Some(inner));
    append_child(body(), outer).unwrap();

    remove(outer).unwrap();
    assert!(exists(inner), "parked until the next flush");

    flush_parked().unwrap();
    assert!(!exists(inner));
    // Root, body and the detached outer host.
    assert_eq!(node_count(), 3);
}

#[test]
fn test_release_policy_frees_nested_content() {
    reset_document();
    set_clear_policy(ClearPolicy::Release);
    let log: Log = Rc::default();

    let inner = panel("inner", &log, None);
    let outer = panel("outer", &log, Some(inner));
    append_child(body(), outer).unwrap();

    release(outer).unwrap();
    assert_eq!(*log.borrow(), vec!["+outer", "+inner", "-outer", "-inner"]);
    assert!(!exists(inner));
    assert_eq!(node_count(), 2);
    reset_config();
}

#[test]
fn test_cleared_button_listener_dropped_on_flush() {
    reset_document();

    let button = h("button", vec![Attr::on("click", |_| {})], ()).unwrap();
    let end = create_marker(")");
    let row = h("li", vec![], tree![button, end]).unwrap();
    append_child(body(), row).unwrap();

    clear_range(button, end).unwrap();
    assert_eq!(state::listener_count(button), 1, "parked, still listening");

    flush_parked().unwrap();
    assert_eq!(state::listener_count(button), 0);
}
