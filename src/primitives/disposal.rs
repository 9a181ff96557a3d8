//! Disposal - Cleanup tied to an element's connection lifetime.
//!
//! A [`DisposalRegistry`] collects cleanups while its element is connected.
//! When the element leaves the document the registry first discards the
//! element's children under the clear policy, so nested custom elements see
//! their own disconnection and the old content does not linger in the arena,
//! then runs every cleanup once, in registration order.
//!
//! Disposal is one-shot per connection. A reconnected element gets whatever
//! its `connected` hook registers again.

use std::cell::RefCell;
use std::rc::Rc;

use crate::engine::{children, discard, exists, CustomElement};
use crate::error::Result;
use crate::primitives::Cleanup;
use crate::types::NodeId;

/// Anything that accepts cleanups.
pub trait Registry {
    fn register_disposer(&self, disposer: Cleanup);
}

/// Ordered, run-once set of cleanups. Clones share the same set.
#[derive(Clone, Default)]
pub struct DisposalRegistry {
    disposers: Rc<RefCell<Vec<Cleanup>>>,
}

impl DisposalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run and forget every registered cleanup.
    ///
    /// The set is emptied before anything runs, so a second call (or a
    /// call from inside a cleanup) does nothing.
    pub fn dispose(&self) {
        let disposers = std::mem::take(&mut *self.disposers.borrow_mut());
        if !disposers.is_empty() {
            tracing::debug!(count = disposers.len(), "disposing");
        }
        for disposer in disposers {
            disposer();
        }
    }

    /// Disconnection of `host`: discard its content, then dispose.
    ///
    /// A host released together with an enclosing element may already be
    /// gone; its content went with it and only the cleanups run.
    pub fn disconnect(&self, host: NodeId) -> Result<()> {
        let cleared = if exists(host) {
            discard(&children(host))
        } else {
            Ok(())
        };
        self.dispose();
        cleared
    }

    pub fn len(&self) -> usize {
        self.disposers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Registry for DisposalRegistry {
    fn register_disposer(&self, disposer: Cleanup) {
        self.disposers.borrow_mut().push(disposer);
    }
}

impl std::fmt::Debug for DisposalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposalRegistry")
            .field("pending", &self.len())
            .finish()
    }
}

// =============================================================================
// Disposing custom elements
// =============================================================================

/// Component rendered by a [`DisposingElement`].
pub trait DisposingComponent {
    /// Render into `host`. Register cleanups with `registry`.
    fn connected(&self, host: NodeId, registry: &DisposalRegistry) -> Result<()>;
}

/// Custom element behavior that owns a [`DisposalRegistry`] and disposes it
/// on disconnection.
pub struct DisposingElement<C> {
    component: C,
    registry: DisposalRegistry,
}

impl<C: DisposingComponent> DisposingElement<C> {
    pub fn new(component: C) -> Self {
        Self {
            component,
            registry: DisposalRegistry::new(),
        }
    }

    pub fn registry(&self) -> &DisposalRegistry {
        &self.registry
    }

    pub fn component(&self) -> &C {
        &self.component
    }
}

impl<C: DisposingComponent> CustomElement for DisposingElement<C> {
    fn connected(&self, host: NodeId) -> Result<()> {
        self.component.connected(host, &self.registry)
    }

    fn disconnected(&self, host: NodeId) -> Result<()> {
        self.registry.disconnect(host)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::engine::{
        append_child, body, children, create_custom_element, create_element, remove,
        reset_document,
    };

    fn counter(registry: &DisposalRegistry, hits: &Rc<Cell<u32>>) {
        let hits = hits.clone();
        registry.register_disposer(Box::new(move || hits.set(hits.get() + 1)));
    }

    #[test]
    fn test_dispose_runs_once_in_order() {
        let registry = DisposalRegistry::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            registry.register_disposer(Box::new(move || order.borrow_mut().push(i)));
        }

        registry.dispose();
        registry.dispose();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_disconnect_twice_is_noop() {
        reset_document();

        let host = create_element("todo-item");
        append_child(host, create_element("li")).unwrap();
        let registry = DisposalRegistry::new();
        let hits = Rc::new(Cell::new(0));
        counter(&registry, &hits);

        registry.disconnect(host).unwrap();
        registry.disconnect(host).unwrap();
        assert_eq!(hits.get(), 1);
        assert!(children(host).is_empty());
    }

    struct Row {
        hits: Rc<Cell<u32>>,
    }

    impl DisposingComponent for Row {
        fn connected(&self, host: NodeId, registry: &DisposalRegistry) -> Result<()> {
            append_child(host, create_element("li"))?;
            counter(registry, &self.hits);
            Ok(())
        }
    }

    #[test]
    fn test_element_disposes_on_removal() {
        reset_document();

        let hits = Rc::new(Cell::new(0));
        let element = Rc::new(DisposingElement::new(Row { hits: hits.clone() }));
        let host = create_custom_element("todo-item", element.clone());

        append_child(body(), host).unwrap();
        assert_eq!(children(host).len(), 1);
        assert_eq!(element.registry().len(), 1);

        remove(host).unwrap();
        assert_eq!(hits.get(), 1);
        assert!(children(host).is_empty(), "content cleared on disconnect");

        // Reconnect renders and registers again.
        append_child(body(), host).unwrap();
        assert_eq!(element.registry().len(), 1);
    }
}
