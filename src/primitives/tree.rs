//! Tree flattening.
//!
//! A [`Tree`] is walked depth-first, left to right. Every real node it
//! denotes is handed to `emit` exactly once; text becomes a fresh text node.

use crate::engine::create_text_node;
use crate::error::Result;
use crate::primitives::Tree;
use crate::types::NodeId;

/// Emit every node `tree` denotes, in order.
///
/// Empty text and [`Tree::Empty`] emit nothing. The first error from `emit`
/// stops the walk.
pub fn for_nodes<E>(tree: Tree, emit: &mut E) -> Result<()>
where
    E: FnMut(NodeId) -> Result<()>,
{
    match tree {
        Tree::Empty => Ok(()),
        Tree::Text(text) if text.is_empty() => Ok(()),
        Tree::Text(text) => emit(create_text_node(text)),
        Tree::Node(node) => emit(node),
        Tree::List(children) => children
            .into_iter()
            .try_for_each(|child| for_nodes(child, emit)),
    }
}

/// Build a [`Tree::List`] from heterogeneous items.
///
/// ```ignore
/// let content = tree!["Mark all as complete", label, None::<NodeId>];
/// ```
#[macro_export]
macro_rules! tree {
    () => {
        $crate::primitives::Tree::List(Vec::new())
    };
    ($($item:expr),+ $(,)?) => {
        $crate::primitives::Tree::List(vec![$($crate::primitives::Tree::from($item)),+])
    };
}
