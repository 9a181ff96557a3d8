//! Primitive types - Content trees, lifetimes, bindings.

use std::rc::Rc;

use crate::primitives::disposal::{DisposalRegistry, Registry};
use crate::types::{NodeId, Value};

// =============================================================================
// Cleanup Function
// =============================================================================

/// Cleanup function returned by reactive constructs.
///
/// Call this to stop the construct and release what it holds.
pub type Cleanup = Box<dyn FnOnce()>;

// =============================================================================
// Tree - Content description
// =============================================================================

/// Content to append somewhere: text, a node, or a nested list of both.
///
/// Built transiently and flattened immediately by
/// [`for_nodes`](crate::primitives::for_nodes).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Tree {
    /// Contributes nothing
    #[default]
    Empty,
    /// Becomes one text node, unless empty
    Text(String),
    /// An existing node (a fragment contributes its children)
    Node(NodeId),
    /// Children in order, nesting unlimited
    List(Vec<Tree>),
}

impl From<&str> for Tree {
    fn from(text: &str) -> Self {
        Tree::Text(text.to_string())
    }
}

impl From<String> for Tree {
    fn from(text: String) -> Self {
        Tree::Text(text)
    }
}

impl From<NodeId> for Tree {
    fn from(node: NodeId) -> Self {
        Tree::Node(node)
    }
}

impl From<()> for Tree {
    fn from(_: ()) -> Self {
        Tree::Empty
    }
}

impl<T: Into<Tree>> From<Vec<T>> for Tree {
    fn from(items: Vec<T>) -> Self {
        Tree::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Tree>> From<Option<T>> for Tree {
    fn from(value: Option<T>) -> Self {
        value.map_or(Tree::Empty, Into::into)
    }
}

// =============================================================================
// Lifetime - Who stops a reactive construct
// =============================================================================

/// Owner of a reactive subscription.
///
/// Every binding, `observing` range and `map_observing` list takes one.
/// There is no implicit owner: a construct either belongs to a registry or
/// is explicitly leaked.
#[derive(Clone)]
pub enum Lifetime {
    /// Stopped when the registry disposes
    Owned(Rc<dyn Registry>),
    /// Never stopped
    Leak,
}

impl Lifetime {
    /// Tie to a disposal registry.
    pub fn owned(registry: &DisposalRegistry) -> Self {
        Lifetime::Owned(Rc::new(registry.clone()))
    }

    /// Hand `cleanup` to the owner.
    pub fn adopt(&self, cleanup: Cleanup) {
        match self {
            Lifetime::Owned(registry) => registry.register_disposer(cleanup),
            // Dropping a stop function does not stop its effect; forgetting
            // it keeps any scope it holds alive as well.
            Lifetime::Leak => std::mem::forget(cleanup),
        }
    }

    pub fn is_leak(&self) -> bool {
        matches!(self, Lifetime::Leak)
    }
}

impl std::fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lifetime::Owned(_) => f.write_str("Lifetime::Owned"),
            Lifetime::Leak => f.write_str("Lifetime::Leak"),
        }
    }
}

// =============================================================================
// Binding - Observed value for obs* attributes
// =============================================================================

/// An observation plus its owner.
///
/// The observation runs inside an effect: once at bind time, then again
/// whenever a signal it read changes.
#[derive(Clone)]
pub struct Binding {
    pub observe: Rc<dyn Fn() -> Value>,
    pub lifetime: Lifetime,
}

impl Binding {
    /// Binding with an explicit owner.
    pub fn new<F, V>(lifetime: Lifetime, observe: F) -> Self
    where
        F: Fn() -> V + 'static,
        V: Into<Value>,
    {
        Self {
            observe: Rc::new(move || observe().into()),
            lifetime,
        }
    }

    /// Binding that is never disposed. For static top-level content.
    pub fn leaked<F, V>(observe: F) -> Self
    where
        F: Fn() -> V + 'static,
        V: Into<Value>,
    {
        Self::new(Lifetime::Leak, observe)
    }

    /// Binding stopped when `registry` disposes.
    pub fn owned<F, V>(registry: &DisposalRegistry, observe: F) -> Self
    where
        F: Fn() -> V + 'static,
        V: Into<Value>,
    {
        Self::new(Lifetime::owned(registry), observe)
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn test_tree_conversions() {
        assert_eq!(Tree::from("a"), Tree::Text("a".into()));
        assert_eq!(Tree::from(None::<&str>), Tree::Empty);
        assert_eq!(
            Tree::from(vec!["a", "b"]),
            Tree::List(vec![Tree::Text("a".into()), Tree::Text("b".into())])
        );
    }

    #[test]
    fn test_owned_lifetime_adopts_into_registry() {
        let registry = DisposalRegistry::new();
        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();

        Lifetime::owned(&registry).adopt(Box::new(move || hits_clone.set(hits_clone.get() + 1)));
        assert_eq!(registry.len(), 1);

        registry.dispose();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_leak_never_runs_cleanup() {
        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();
        Lifetime::Leak.adopt(Box::new(move || hits_clone.set(1)));
        assert_eq!(hits.get(), 0);
    }
}
