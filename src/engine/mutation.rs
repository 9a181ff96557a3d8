//! Tree mutation with connection tracking.
//!
//! Every structural change goes through here so the `CONNECTED` flag stays
//! exact and custom elements see their lifecycle callbacks. Callbacks are
//! queued while the arena is borrowed and run once the borrow is released,
//! disconnections before connections.

use std::cell::Cell;
use std::rc::Rc;

use super::custom::CustomElement;
use super::registry::{free_subtree, with_document, with_document_mut};
use crate::config::{self, ClearPolicy};
use crate::error::{DomError, Result};
use crate::types::{NodeId, NodeKind};

// =============================================================================
// Lifecycle Reactions
// =============================================================================

enum Reaction {
    Connected(NodeId, Rc<dyn CustomElement>),
    Disconnected(NodeId, Rc<dyn CustomElement>),
}

thread_local! {
    /// Lifecycle callbacks currently on the stack
    static CALLBACK_DEPTH: Cell<usize> = const { Cell::new(0) };
}

fn in_callback() -> bool {
    CALLBACK_DEPTH.with(|depth| depth.get() > 0)
}

fn run_reactions(reactions: Vec<Reaction>) {
    if reactions.is_empty() {
        return;
    }
    CALLBACK_DEPTH.with(|depth| depth.set(depth.get() + 1));
    for reaction in reactions {
        match reaction {
            Reaction::Disconnected(id, behavior) => {
                tracing::debug!(node = %id, "disconnected callback");
                if let Err(err) = behavior.disconnected(id) {
                    tracing::error!(node = %id, error = %err, "disconnected callback failed");
                }
            }
            Reaction::Connected(id, behavior) => {
                // Removed again by an earlier callback.
                if !super::is_connected(id) {
                    continue;
                }
                tracing::debug!(node = %id, "connected callback");
                if let Err(err) = behavior.connected(id) {
                    tracing::error!(node = %id, error = %err, "connected callback failed");
                }
            }
        }
    }
    CALLBACK_DEPTH.with(|depth| depth.set(depth.get() - 1));
}

// =============================================================================
// Insertion
// =============================================================================

/// Append `node` as the last child of `parent`.
///
/// Appending a fragment moves the fragment's children instead, leaving it
/// empty.
pub fn append_child(parent: NodeId, node: NodeId) -> Result<()> {
    insert_child_before(parent, node, None)
}

/// Insert `node` into `parent` before `reference` (`None` appends).
pub fn insert_child_before(parent: NodeId, node: NodeId, reference: Option<NodeId>) -> Result<()> {
    let reactions = with_document_mut(|doc| -> Result<Vec<Reaction>> {
        let parent_node = doc.node(parent)?;
        if !parent_node.kind.accepts_children() {
            return Err(DomError::HierarchyRequest { parent, child: node });
        }
        let parent_connected = parent_node.is_connected();
        let node_kind = doc.node(node)?.kind.clone();
        if node_kind == NodeKind::Document || doc.is_inclusive_ancestor(node, parent) {
            return Err(DomError::HierarchyRequest { parent, child: node });
        }

        let moving = if node_kind == NodeKind::Fragment {
            doc.children(node)
        } else {
            vec![node]
        };

        let mut reference = reference;
        if let Some(r) = reference {
            if doc.node(r)?.parent != Some(parent) {
                return Err(DomError::HierarchyRequest { parent, child: r });
            }
            // Inserting a node before itself: anchor on whatever follows the
            // moved run instead.
            while let Some(r) = reference.filter(|r| moving.contains(r)) {
                reference = doc.get(r).and_then(|n| n.next_sibling);
            }
        }

        let mut disconnected = Vec::new();
        let mut connected = Vec::new();
        for child in moving {
            let was_connected = doc.get(child).is_some_and(|n| n.is_connected());
            doc.unlink(child);
            // A move inside the document still disconnects first.
            if was_connected {
                disconnected.extend(
                    doc.mark_connected(child, false)
                        .into_iter()
                        .map(|(id, b)| Reaction::Disconnected(id, b)),
                );
            }
            doc.link_before(parent, child, reference);
            if parent_connected {
                connected.extend(
                    doc.mark_connected(child, true)
                        .into_iter()
                        .map(|(id, b)| Reaction::Connected(id, b)),
                );
            }
        }

        disconnected.extend(connected);
        Ok(disconnected)
    })?;

    run_reactions(reactions);
    Ok(())
}

/// Insert `node` immediately before `reference` in the reference's parent.
pub fn insert_before(reference: NodeId, node: NodeId) -> Result<()> {
    let parent = with_document(|doc| doc.node(reference).map(|n| n.parent))?
        .ok_or(DomError::Detached(reference))?;
    insert_child_before(parent, node, Some(reference))
}

// =============================================================================
// Removal
// =============================================================================

/// Detach `node` from its parent. A parentless node is left as is.
pub fn remove(node: NodeId) -> Result<()> {
    let reactions = with_document_mut(|doc| -> Result<Vec<Reaction>> {
        let data = doc.node(node)?;
        if data.parent.is_none() {
            return Ok(Vec::new());
        }
        let was_connected = data.is_connected();
        doc.unlink(node);
        if !was_connected {
            return Ok(Vec::new());
        }
        Ok(doc
            .mark_connected(node, false)
            .into_iter()
            .map(|(id, b)| Reaction::Disconnected(id, b))
            .collect())
    })?;

    run_reactions(reactions);
    Ok(())
}

/// Remove every child of `node`.
///
/// Children are only detached, never freed: their own disconnection
/// callbacks may still be pending. Use [`release`] on them to free them.
pub fn clear_children(node: NodeId) -> Result<()> {
    let kids = with_document(|doc| doc.node(node).map(|_| doc.children(node)))?;
    for child in kids {
        remove(child)?;
    }
    Ok(())
}

/// Detach `node` and free its whole subtree.
///
/// Listeners registered on the freed nodes are dropped. Handles into the
/// subtree become stale.
pub fn release(node: NodeId) -> Result<()> {
    remove(node)?;
    for freed in free_subtree(node) {
        crate::state::forget_node(freed);
    }
    Ok(())
}

/// Get rid of nodes that left a live range, according to the clear policy.
///
/// A top-level park releases every earlier parking fragment first, so at
/// most the latest clear (and whatever its callbacks cleared) stays parked.
/// Inside a lifecycle callback nothing is released: an outer clear may still
/// be moving nodes into its own parking fragment.
pub(crate) fn discard(nodes: &[NodeId]) -> Result<()> {
    match config::clear_policy() {
        ClearPolicy::Park => {
            if nodes.is_empty() {
                return Ok(());
            }
            if !in_callback() {
                flush_parked()?;
            }
            let parking = super::create_fragment();
            with_document_mut(|doc| doc.park(parking));
            // Nodes inside a flushed park are gone already.
            for node in nodes.iter().filter(|node| super::exists(**node)) {
                append_child(parking, *node)?;
            }
        }
        ClearPolicy::Release => {
            for node in nodes {
                release(*node)?;
            }
        }
    }
    Ok(())
}

/// Release every parking fragment. Parked handles become stale.
pub fn flush_parked() -> Result<()> {
    let stale = with_document_mut(|doc| doc.take_parked());
    if !stale.is_empty() {
        tracing::trace!(count = stale.len(), "releasing parked ranges");
    }
    for fragment in stale {
        // Already released through some other path.
        if super::exists(fragment) {
            release(fragment)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::engine::{
        body, children, create_comment, create_custom_element, create_element,
        create_fragment, create_text_node, exists, is_connected, next_sibling, node_count, parent,
        parked_count, reset_document,
    };

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl CustomElement for Recorder {
        fn connected(&self, _host: NodeId) -> Result<()> {
            self.log.borrow_mut().push(format!("+{}", self.name));
            Ok(())
        }

        fn disconnected(&self, _host: NodeId) -> Result<()> {
            self.log.borrow_mut().push(format!("-{}", self.name));
            Ok(())
        }
    }

    fn recorder(name: &'static str, log: &Rc<RefCell<Vec<String>>>) -> NodeId {
        create_custom_element(
            "x-recorder",
            Rc::new(Recorder {
                name,
                log: log.clone(),
            }),
        )
    }

    #[test]
    fn test_append_fragment_moves_children() {
        reset_document();

        let list = create_element("ul");
        let fragment = create_fragment();
        let (a, b) = (create_text_node("a"), create_text_node("b"));
        append_child(fragment, a).unwrap();
        append_child(fragment, b).unwrap();

        append_child(list, fragment).unwrap();

        assert_eq!(children(list), vec![a, b]);
        assert!(children(fragment).is_empty(), "fragment ends empty");
        assert_eq!(parent(a), Some(list));
    }

    #[test]
    fn test_insert_before_reference() {
        reset_document();

        let list = create_element("ul");
        let end = create_comment("#");
        append_child(list, end).unwrap();
        let a = create_text_node("a");
        let b = create_text_node("b");
        insert_before(end, a).unwrap();
        insert_before(end, b).unwrap();

        assert_eq!(children(list), vec![a, b, end]);
        assert_eq!(next_sibling(b), Some(end));
    }

    #[test]
    fn test_insert_before_detached_reference_fails() {
        reset_document();

        let lonely = create_comment("x");
        let node = create_text_node("a");
        assert_eq!(insert_before(lonely, node), Err(DomError::Detached(lonely)));
    }

    #[test]
    fn test_hierarchy_checks() {
        reset_document();

        let outer = create_element("div");
        let inner = create_element("div");
        append_child(outer, inner).unwrap();

        assert!(matches!(
            append_child(inner, outer),
            Err(DomError::HierarchyRequest { .. })
        ));
        let text = create_text_node("t");
        assert!(matches!(
            append_child(text, create_element("b")),
            Err(DomError::HierarchyRequest { .. })
        ));
    }

    #[test]
    fn test_connection_lifecycle_in_tree_order() {
        reset_document();
        let log = Rc::new(RefCell::new(Vec::new()));

        let outer = recorder("outer", &log);
        let inner = recorder("inner", &log);
        append_child(outer, inner).unwrap();
        assert!(log.borrow().is_empty(), "detached trees fire nothing");

        append_child(body(), outer).unwrap();
        assert!(is_connected(inner));
        assert_eq!(*log.borrow(), vec!["+outer", "+inner"]);

        remove(outer).unwrap();
        assert!(!is_connected(inner));
        assert_eq!(*log.borrow(), vec!["+outer", "+inner", "-outer", "-inner"]);
    }

    #[test]
    fn test_move_within_document_reconnects() {
        reset_document();
        let log = Rc::new(RefCell::new(Vec::new()));

        let a = create_element("div");
        let b = create_element("div");
        append_child(body(), a).unwrap();
        append_child(body(), b).unwrap();
        let p = recorder("p", &log);
        append_child(a, p).unwrap();

        append_child(b, p).unwrap();
        assert_eq!(*log.borrow(), vec!["+p", "-p", "+p"]);
    }

    #[test]
    fn test_release_frees_subtree() {
        reset_document();

        let list = create_element("ul");
        let item = create_element("li");
        append_child(list, item).unwrap();
        append_child(body(), list).unwrap();

        release(list).unwrap();
        assert!(!exists(list));
        assert!(!exists(item));
        assert!(children(body()).is_empty());
    }

    #[test]
    fn test_park_releases_earlier_parks() {
        reset_document();

        let (a, b) = (create_text_node("a"), create_text_node("b"));
        discard(&[a]).unwrap();
        assert!(exists(a));
        assert_eq!(parked_count(), 1);

        discard(&[b]).unwrap();
        assert!(!exists(a), "earlier park released");
        assert!(exists(b));
        assert_eq!(parked_count(), 1);

        flush_parked().unwrap();
        assert!(!exists(b));
        assert_eq!(parked_count(), 0);
        assert_eq!(node_count(), 2);
    }

    #[test]
    fn test_empty_discard_parks_nothing() {
        reset_document();

        discard(&[]).unwrap();
        assert_eq!(parked_count(), 0);
        assert_eq!(node_count(), 2);
    }
}
