//! Node Registry - Slot allocation for the document arena.
//!
//! Manages the lifecycle of node slots:
//! - Generational handles so released slots are never aliased
//! - Free slot pool for O(1) reuse
//! - Sibling/child links (first/last child, prev/next sibling)
//! - Root document node plus a `body` element, both always connected

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use super::custom::{self, CustomElement};
use crate::error::{DomError, Result};
use crate::types::{NodeFlags, NodeId, NodeKind, Value};

// =============================================================================
// Node Storage
// =============================================================================

/// Everything the arena knows about one node.
pub(crate) struct NodeData {
    pub kind: NodeKind,
    pub flags: NodeFlags,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub attributes: IndexMap<String, String>,
    pub properties: HashMap<String, Value>,
    pub style: IndexMap<String, String>,
    pub behavior: Option<Rc<dyn CustomElement>>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            flags: NodeFlags::empty(),
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            attributes: IndexMap::new(),
            properties: HashMap::new(),
            style: IndexMap::new(),
            behavior: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.flags.contains(NodeFlags::CONNECTED)
    }
}

struct Slot {
    generation: u32,
    node: Option<NodeData>,
}

/// The arena. One per thread.
pub(crate) struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    body: NodeId,
    /// Fragments holding cleared ranges, oldest first
    parked: Vec<NodeId>,
}

impl Document {
    fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId::new(0, 0),
            body: NodeId::new(0, 0),
            parked: Vec::new(),
        };
        let root = doc.allocate(NodeKind::Document);
        let body = doc.allocate(NodeKind::Element {
            tag: "body".to_string(),
            is: None,
        });
        doc.link_before(root, body, None);
        for id in [root, body] {
            if let Some(node) = doc.get_mut(id) {
                node.flags.insert(NodeFlags::CONNECTED);
            }
        }
        doc.root = root;
        doc.body = body;
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn allocate(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData::new(kind);
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(data);
            NodeId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(data),
            });
            NodeId::new(index, 0)
        }
    }

    /// Free one slot. The caller unlinks first.
    fn free_slot(&mut self, id: NodeId) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            if slot.generation == id.generation && slot.node.is_some() {
                slot.node = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
            }
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn node(&self, id: NodeId) -> Result<&NodeData> {
        self.get(id).ok_or(DomError::StaleNode(id))
    }

    pub fn count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn park(&mut self, fragment: NodeId) {
        self.parked.push(fragment);
    }

    pub fn take_parked(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.parked)
    }

    pub fn parked_count(&self) -> usize {
        self.parked.len()
    }

    // -------------------------------------------------------------------------
    // Links
    // -------------------------------------------------------------------------

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.get(id).and_then(|n| n.first_child);
        while let Some(child) = current {
            out.push(child);
            current = self.get(child).and_then(|n| n.next_sibling);
        }
        out
    }

    /// `id` and all its descendants in tree order.
    pub fn inclusive_descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut kids = self.children(current);
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Detach `id` from its parent and siblings.
    pub fn unlink(&mut self, id: NodeId) {
        let Some((parent, prev, next)) = self
            .get(id)
            .map(|n| (n.parent, n.prev_sibling, n.next_sibling))
        else {
            return;
        };
        let Some(parent) = parent else { return };

        match prev {
            Some(prev) => {
                if let Some(p) = self.get_mut(prev) {
                    p.next_sibling = next;
                }
            }
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.first_child = next;
                }
            }
        }
        match next {
            Some(next) => {
                if let Some(n) = self.get_mut(next) {
                    n.prev_sibling = prev;
                }
            }
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.last_child = prev;
                }
            }
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = None;
            node.prev_sibling = None;
            node.next_sibling = None;
        }
    }

    /// Link an unparented `child` into `parent` before `reference`
    /// (`None` appends).
    pub fn link_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let prev = match reference {
            Some(reference) => self.get(reference).and_then(|n| n.prev_sibling),
            None => self.get(parent).and_then(|n| n.last_child),
        };

        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = reference;
        }
        match prev {
            Some(prev) => {
                if let Some(p) = self.get_mut(prev) {
                    p.next_sibling = Some(child);
                }
            }
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.first_child = Some(child);
                }
            }
        }
        match reference {
            Some(reference) => {
                if let Some(r) = self.get_mut(reference) {
                    r.prev_sibling = Some(child);
                }
            }
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.last_child = Some(child);
                }
            }
        }
    }

    /// Set or clear `CONNECTED` on a whole subtree. Returns the custom
    /// elements whose state actually flipped, in tree order.
    pub fn mark_connected(
        &mut self,
        id: NodeId,
        connected: bool,
    ) -> Vec<(NodeId, Rc<dyn CustomElement>)> {
        let mut flipped = Vec::new();
        for node_id in self.inclusive_descendants(id) {
            let Some(node) = self.get_mut(node_id) else { continue };
            if node.is_connected() == connected {
                continue;
            }
            node.flags.set(NodeFlags::CONNECTED, connected);
            if let Some(behavior) = &node.behavior {
                flipped.push((node_id, behavior.clone()));
            }
        }
        flipped
    }
}

thread_local! {
    static DOCUMENT: RefCell<Document> = RefCell::new(Document::new());
}

pub(crate) fn with_document<R>(f: impl FnOnce(&Document) -> R) -> R {
    DOCUMENT.with(|doc| f(&doc.borrow()))
}

pub(crate) fn with_document_mut<R>(f: impl FnOnce(&mut Document) -> R) -> R {
    DOCUMENT.with(|doc| f(&mut doc.borrow_mut()))
}

// =============================================================================
// Node Creation
// =============================================================================

/// The document root node.
pub fn document() -> NodeId {
    with_document(|doc| doc.root())
}

/// The `body` element. Anything appended below it is connected.
pub fn body() -> NodeId {
    with_document(|doc| doc.body())
}

/// Create an element. Upgrades it if a custom element is defined for `tag`.
pub fn create_element(tag: &str) -> NodeId {
    create_element_is(tag, None)
}

/// Create an element, honoring a customized built-in specifier.
///
/// The definition is looked up by `is` when given, otherwise by `tag`.
pub fn create_element_is(tag: &str, is: Option<&str>) -> NodeId {
    let tag = tag.to_ascii_lowercase();
    let definition_name = is.unwrap_or(&tag).to_string();
    let behavior = custom::lookup(&definition_name).map(|factory| factory());

    let id = with_document_mut(|doc| {
        doc.allocate(NodeKind::Element {
            tag: tag.clone(),
            is: is.map(str::to_string),
        })
    });
    if let Some(behavior) = behavior {
        attach_behavior(id, behavior);
    }
    id
}

/// Create an element with an explicit behavior, bypassing the definition
/// registry. Used for custom elements referenced by type.
pub fn create_custom_element(tag: &str, behavior: Rc<dyn CustomElement>) -> NodeId {
    let id = with_document_mut(|doc| {
        doc.allocate(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            is: None,
        })
    });
    attach_behavior(id, behavior);
    id
}

fn attach_behavior(id: NodeId, behavior: Rc<dyn CustomElement>) {
    with_document_mut(|doc| {
        if let Some(node) = doc.get_mut(id) {
            node.behavior = Some(behavior);
            node.flags.insert(NodeFlags::CUSTOM);
        }
    });
}

pub fn create_text_node(text: impl Into<String>) -> NodeId {
    with_document_mut(|doc| doc.allocate(NodeKind::Text(text.into())))
}

pub fn create_comment(text: impl Into<String>) -> NodeId {
    with_document_mut(|doc| doc.allocate(NodeKind::Comment(text.into())))
}

/// Create an invisible marker comment.
pub fn create_marker(label: impl Into<String>) -> NodeId {
    with_document_mut(|doc| {
        let id = doc.allocate(NodeKind::Comment(label.into()));
        if let Some(node) = doc.get_mut(id) {
            node.flags.insert(NodeFlags::MARKER);
        }
        id
    })
}

pub fn create_fragment() -> NodeId {
    with_document_mut(|doc| doc.allocate(NodeKind::Fragment))
}

// =============================================================================
// Lookups
// =============================================================================

/// Check if a handle still refers to a live node.
pub fn exists(id: NodeId) -> bool {
    with_document(|doc| doc.get(id).is_some())
}

pub fn kind(id: NodeId) -> Option<NodeKind> {
    with_document(|doc| doc.get(id).map(|n| n.kind.clone()))
}

pub fn flags(id: NodeId) -> NodeFlags {
    with_document(|doc| doc.get(id).map(|n| n.flags).unwrap_or_default())
}

pub fn is_connected(id: NodeId) -> bool {
    flags(id).contains(NodeFlags::CONNECTED)
}

pub fn is_marker(id: NodeId) -> bool {
    flags(id).contains(NodeFlags::MARKER)
}

pub fn tag_name(id: NodeId) -> Option<String> {
    with_document(|doc| doc.get(id).and_then(|n| n.kind.tag().map(str::to_string)))
}

pub fn parent(id: NodeId) -> Option<NodeId> {
    with_document(|doc| doc.get(id).and_then(|n| n.parent))
}

pub fn first_child(id: NodeId) -> Option<NodeId> {
    with_document(|doc| doc.get(id).and_then(|n| n.first_child))
}

pub fn last_child(id: NodeId) -> Option<NodeId> {
    with_document(|doc| doc.get(id).and_then(|n| n.last_child))
}

pub fn next_sibling(id: NodeId) -> Option<NodeId> {
    with_document(|doc| doc.get(id).and_then(|n| n.next_sibling))
}

pub fn previous_sibling(id: NodeId) -> Option<NodeId> {
    with_document(|doc| doc.get(id).and_then(|n| n.prev_sibling))
}

pub fn children(id: NodeId) -> Vec<NodeId> {
    with_document(|doc| doc.children(id))
}

/// Whether `node` is `ancestor` or below it.
pub fn contains(ancestor: NodeId, node: NodeId) -> bool {
    with_document(|doc| doc.is_inclusive_ancestor(ancestor, node))
}

/// Custom element behavior attached to `id`, if any.
pub fn behavior(id: NodeId) -> Option<Rc<dyn CustomElement>> {
    with_document(|doc| doc.get(id).and_then(|n| n.behavior.clone()))
}

/// Number of live nodes, root and body included.
pub fn node_count() -> usize {
    with_document(|doc| doc.count())
}

/// Validate a handle.
pub fn check(id: NodeId) -> Result<()> {
    with_document(|doc| doc.node(id).map(|_| ()))
}

/// Number of parking fragments not yet released.
pub fn parked_count() -> usize {
    with_document(|doc| doc.parked_count())
}

// =============================================================================
// Reset (for testing)
// =============================================================================

/// Drop every node and start over with a fresh root and body.
pub fn reset_document() {
    DOCUMENT.with(|doc| *doc.borrow_mut() = Document::new());
    crate::state::reset_event_state();
}

// =============================================================================
// Release
// =============================================================================

/// Free every slot of a detached subtree.
pub(crate) fn free_subtree(id: NodeId) -> Vec<NodeId> {
    with_document_mut(|doc| {
        let all = doc.inclusive_descendants(id);
        for node_id in &all {
            doc.free_slot(*node_id);
        }
        all
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_and_body_connected() {
        reset_document();

        assert!(is_connected(document()));
        assert!(is_connected(body()));
        assert_eq!(parent(body()), Some(document()));
        assert_eq!(node_count(), 2);
    }

    #[test]
    fn test_create_nodes() {
        reset_document();

        let el = create_element("LI");
        let text = create_text_node("hi");
        let marker = create_marker("|");

        assert_eq!(tag_name(el).as_deref(), Some("li"));
        assert_eq!(kind(text), Some(NodeKind::Text("hi".into())));
        assert!(is_marker(marker));
        assert!(!is_marker(create_comment("plain")));
        assert!(!is_connected(el), "fresh nodes are detached");
    }

    #[test]
    fn test_release_and_reuse_bumps_generation() {
        reset_document();

        let a = create_text_node("a");
        free_subtree(a);
        assert!(!exists(a));

        let b = create_text_node("b");
        assert_eq!(b.index(), a.index(), "slot should be reused");
        assert_ne!(b.generation(), a.generation());
        assert!(exists(b));
        assert!(!exists(a), "old handle stays stale");
        assert_eq!(check(a), Err(DomError::StaleNode(a)));
    }

    #[test]
    fn test_links() {
        reset_document();

        let ul = create_element("ul");
        let (a, b, c) = (create_text_node("a"), create_text_node("b"), create_text_node("c"));
        with_document_mut(|doc| {
            doc.link_before(ul, a, None);
            doc.link_before(ul, c, None);
            doc.link_before(ul, b, Some(c));
        });

        assert_eq!(children(ul), vec![a, b, c]);
        assert_eq!(next_sibling(a), Some(b));
        assert_eq!(previous_sibling(c), Some(b));

        with_document_mut(|doc| doc.unlink(b));
        assert_eq!(children(ul), vec![a, c]);
        assert_eq!(parent(b), None);
        assert_eq!(first_child(ul), Some(a));
        assert_eq!(last_child(ul), Some(c));
    }
}
