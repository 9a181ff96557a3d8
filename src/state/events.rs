//! Events Module - DOM event dispatch and listener registry
//!
//! Listeners live in a thread-local registry keyed by node, the same shape
//! as a keyboard handler registry: each entry carries an id so the cleanup
//! returned from [`add_event_listener`] removes exactly that listener.
//!
//! # Dispatch
//!
//! [`dispatch_event`] walks the target and then, for bubbling events, each
//! ancestor. Listeners of a node run in registration order.
//! `stop_propagation` finishes the current node and stops;
//! `stop_immediate_propagation` stops at once.
//!
//! ```ignore
//! let cleanup = add_event_listener(button, "click", |event| {
//!     event.prevent_default();
//! });
//! let not_cancelled = dispatch_event(button, Event::new("click"));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::engine;
use crate::types::{NodeId, Value};

// =============================================================================
// TYPES
// =============================================================================

/// A dispatched event.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Event type, e.g. "click", "submit", "change"
    pub kind: String,
    /// Payload for custom events
    pub detail: Value,
    /// Whether the event travels up through ancestors
    pub bubbles: bool,
    target: Option<NodeId>,
    current_target: Option<NodeId>,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
}

impl Event {
    /// Create a bubbling event with no detail
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: Value::Null,
            bubbles: true,
            target: None,
            current_target: None,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    /// Create a bubbling event carrying `detail`
    pub fn with_detail(kind: impl Into<String>, detail: impl Into<Value>) -> Self {
        Self {
            detail: detail.into(),
            ..Self::new(kind)
        }
    }

    /// Same event, not bubbling
    pub fn non_bubbling(mut self) -> Self {
        self.bubbles = false;
        self
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// Node the event was dispatched at
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// Node whose listeners are currently running
    pub fn current_target(&self) -> Option<NodeId> {
        self.current_target
    }
}

/// Listener callback. Rc so dispatch can run it without holding the registry.
pub type EventHandler = Rc<dyn Fn(&mut Event)>;

// =============================================================================
// HANDLER REGISTRY
// =============================================================================

struct ListenerRegistry {
    by_node: HashMap<NodeId, Vec<(usize, String, EventHandler)>>,
    next_id: usize,
}

impl ListenerRegistry {
    fn new() -> Self {
        Self {
            by_node: HashMap::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

thread_local! {
    static REGISTRY: RefCell<ListenerRegistry> = RefCell::new(ListenerRegistry::new());
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Listen for `kind` events on `node`.
/// Returns cleanup function.
pub fn add_event_listener<F>(node: NodeId, kind: &str, handler: F) -> impl FnOnce() + use<F>
where
    F: Fn(&mut Event) + 'static,
{
    add_handler(node, kind, Rc::new(handler))
}

/// Same as [`add_event_listener`] with an already shared handler.
pub fn add_handler(node: NodeId, kind: &str, handler: EventHandler) -> impl FnOnce() + use<> {
    let id = REGISTRY.with(|reg| {
        let mut reg = reg.borrow_mut();
        let id = reg.next_id();
        reg.by_node
            .entry(node)
            .or_default()
            .push((id, kind.to_string(), handler));
        id
    });

    move || {
        REGISTRY.with(|reg| {
            let mut reg = reg.borrow_mut();
            if let Some(listeners) = reg.by_node.get_mut(&node) {
                listeners.retain(|(listener_id, _, _)| *listener_id != id);
                if listeners.is_empty() {
                    reg.by_node.remove(&node);
                }
            }
        });
    }
}

/// Number of listeners registered on `node`.
pub fn listener_count(node: NodeId) -> usize {
    REGISTRY.with(|reg| reg.borrow().by_node.get(&node).map_or(0, Vec::len))
}

/// Dispatch `event` at `target`.
/// Returns false if a listener prevented the default action.
pub fn dispatch_event(target: NodeId, mut event: Event) -> bool {
    event.target = Some(target);

    let mut path = vec![target];
    if event.bubbles {
        let mut current = engine::parent(target);
        while let Some(node) = current {
            path.push(node);
            current = engine::parent(node);
        }
    }

    for node in path {
        // Snapshot so listeners may add/remove listeners while running.
        let handlers: Vec<EventHandler> = REGISTRY.with(|reg| {
            reg.borrow()
                .by_node
                .get(&node)
                .map(|listeners| {
                    listeners
                        .iter()
                        .filter(|(_, kind, _)| *kind == event.kind)
                        .map(|(_, _, handler)| handler.clone())
                        .collect()
                })
                .unwrap_or_default()
        });

        event.current_target = Some(node);
        for handler in handlers {
            handler(&mut event);
            if event.immediate_propagation_stopped {
                return !event.default_prevented;
            }
        }
        if event.propagation_stopped {
            break;
        }
    }

    !event.default_prevented
}

/// Drop all listeners of a node.
/// Called when the node is released.
pub fn forget_node(node: NodeId) {
    REGISTRY.with(|reg| {
        reg.borrow_mut().by_node.remove(&node);
    });
}

/// Reset listener state (for testing)
pub fn reset_event_state() {
    REGISTRY.with(|reg| {
        *reg.borrow_mut() = ListenerRegistry::new();
    });
}
