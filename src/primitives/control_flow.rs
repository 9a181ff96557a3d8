//! Control Flow Primitives - Reactive ranges and live lists.
//!
//! - [`observing`] - One reactive expression rendered into a marked range,
//!   replaced wholesale on every change
//! - [`map_observing`] - An [`ObservableVec`] rendered as a live run of
//!   nodes, one marked block per item, patched per splice/update
//! - [`clear_range`] - Remove a run of siblings between two boundaries
//!
//! # Markers
//!
//! Both constructs return a fragment. Its content is delimited by marker
//! comments that stay in place while content changes around them:
//!
//! ```text
//! observing:      <!--(--> ...content... <!--)-->
//! map_observing:  <!--|--> item 0 <!--|--> item 1 ... <!--#-->
//! ```
//!
//! A list keeps `markers[i]` as the start of item `i` and `markers[i + 1]`
//! as its exclusive end, with the `#` sentinel last. There is always exactly
//! one marker more than there are items, also for items that render nothing.
//!
//! # Pattern: EffectScope per generation
//!
//! Each `observing` generation and each list item renders inside its own
//! effect scope. Bindings created while rendering belong to that scope and
//! stop when their content is replaced or removed:
//! 1. Create an EffectScope
//! 2. Render inside `scope.run()`
//! 3. Keep `Box::new(move || scope.stop())` as the block's Cleanup
//!
//! # Lifetime
//!
//! The returned fragment stays live until its [`Lifetime`] ends. Ending it
//! stops the observation and every per-generation or per-item scope.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_signals::{effect, effect_scope, untrack};

use crate::config::config;
use crate::engine::{
    append_child, create_fragment, create_marker, discard, insert_before, next_sibling,
};
use crate::error::{DomError, Result};
use crate::primitives::{for_nodes, Cleanup, Lifetime, Tree};
use crate::state::{ArrayChange, ObservableVec};
use crate::types::NodeId;

// =============================================================================
// clear_range()
// =============================================================================

/// Remove `first` and its following siblings up to `end` (exclusive).
///
/// Nothing is touched unless `end` is actually reachable from `first`.
/// Removed nodes are parked or released according to the clear policy.
pub fn clear_range(first: NodeId, end: NodeId) -> Result<()> {
    let mut span = Vec::new();
    let mut current = Some(first);
    while let Some(node) = current {
        if node == end {
            break;
        }
        span.push(node);
        current = next_sibling(node);
    }

    if current != Some(end) {
        tracing::error!(start = %first, %end, "clear_range: boundary missing");
        return Err(DomError::BrokenRange { start: first, end });
    }

    tracing::trace!(count = span.len(), "clear_range");
    discard(&span)
}

/// Clear everything strictly between two markers.
fn clear_between(start: NodeId, end: NodeId) -> Result<()> {
    match next_sibling(start) {
        Some(first) => clear_range(first, end),
        None => {
            tracing::error!(%start, %end, "clear_range: boundary missing");
            Err(DomError::BrokenRange { start, end })
        }
    }
}

/// Render `tree`-producing work inside a fresh effect scope.
fn render_scoped<F>(render: F) -> (Result<Tree>, Cleanup)
where
    F: FnOnce() -> Result<Tree> + 'static,
{
    let output: Rc<RefCell<Option<Result<Tree>>>> = Rc::new(RefCell::new(None));
    let output_clone = output.clone();

    let scope = effect_scope(false);
    scope.run(move || {
        *output_clone.borrow_mut() = Some(render());
    });

    let result = output.borrow_mut().take().unwrap_or(Ok(Tree::Empty));
    (result, Box::new(move || scope.stop()))
}

/// Flatten a tree into the nodes it denotes.
fn collect_nodes(tree: Tree) -> Result<Vec<NodeId>> {
    let mut nodes = Vec::new();
    for_nodes(tree, &mut |node| {
        nodes.push(node);
        Ok(())
    })?;
    Ok(nodes)
}

// =============================================================================
// observing()
// =============================================================================

/// Options for [`observing`].
#[derive(Debug, Clone)]
pub struct ObservingOptions {
    /// Render once at creation (default). Otherwise the range stays empty
    /// until the first change.
    pub fire_immediately: bool,
    /// Owner of the observation
    pub lifetime: Lifetime,
}

impl ObservingOptions {
    pub fn new(lifetime: Lifetime) -> Self {
        Self {
            fire_immediately: true,
            lifetime,
        }
    }

    /// Never stopped.
    pub fn leaked() -> Self {
        Self::new(Lifetime::Leak)
    }

    /// Wait for the first change before rendering.
    pub fn deferred(mut self) -> Self {
        self.fire_immediately = false;
        self
    }
}

/// Render `generate(value, previous)` into a marked range, re-rendering the
/// whole range whenever `expression` re-runs.
///
/// Only signals read by `expression` trigger a re-render. The generator runs
/// untracked, inside a fresh effect scope per generation: bindings it creates
/// still react on their own and stop when the generation is replaced.
///
/// Every dependency change re-runs the generator, also when the new value
/// equals the old one.
///
/// # Arguments
///
/// * `expression` - Getter producing the observed value (creates reactive dependency)
/// * `generate` - Receives the value and the previous one (`None` on the
///   first render after an immediate fire) and returns the range content
/// * `options` - Immediate or deferred first render, and the owning [`Lifetime`]
///
/// # Returns
///
/// A fragment holding the start marker, the content and the end marker.
/// An error from the first render is returned. Later errors are reported
/// and leave the range empty.
///
/// # Example
///
/// ```ignore
/// use spark_dom::{h, observing, Lifetime, ObservingOptions};
/// use spark_signals::signal;
///
/// let remaining = signal(2);
/// let remaining_clone = remaining.clone();
///
/// let label = observing(
///     move || remaining_clone.get(),
///     |count, _| Ok(format!("{count} items left")),
///     ObservingOptions::new(Lifetime::owned(&registry)),
/// )?;
/// h("span", vec![], label)?;
///
/// remaining.set(1); // range now holds "1 items left"
/// ```
pub fn observing<T, E, G, R>(expression: E, generate: G, options: ObservingOptions) -> Result<NodeId>
where
    T: Clone + 'static,
    E: Fn() -> T + 'static,
    G: Fn(&T, Option<&T>) -> Result<R> + 'static,
    R: Into<Tree>,
{
    let marks = config();
    let fragment = create_fragment();
    let start = create_marker(marks.range_start);
    let end = create_marker(marks.range_end);
    append_child(fragment, start)?;
    append_child(fragment, end)?;

    let generate = Rc::new(generate);
    let previous: Rc<RefCell<Option<T>>> = Rc::new(RefCell::new(None));
    let generation: Rc<RefCell<Option<Cleanup>>> = Rc::new(RefCell::new(None));
    let initial_error: Rc<RefCell<Option<DomError>>> = Rc::new(RefCell::new(None));
    let first_run = Rc::new(Cell::new(true));
    let fire_immediately = options.fire_immediately;

    let generation_effect = generation.clone();
    let initial_error_effect = initial_error.clone();
    let stop = effect(move || {
        let value = expression();
        let is_first = first_run.replace(false);
        if is_first && !fire_immediately {
            *previous.borrow_mut() = Some(value);
            return;
        }

        let prev = previous.borrow_mut().replace(value.clone());
        let result = regenerate(start, end, &generation_effect, {
            let generate = generate.clone();
            move || untrack(|| generate(&value, prev.as_ref())).map(Into::into)
        });

        if let Err(err) = result {
            if is_first {
                *initial_error_effect.borrow_mut() = Some(err);
            } else {
                tracing::error!(error = %err, "observing: render failed");
            }
        }
    });

    let dispose_generation = move || {
        let current = generation.borrow_mut().take();
        if let Some(stop_generation) = current {
            stop_generation();
        }
    };

    let failed = initial_error.borrow_mut().take();
    if let Some(err) = failed {
        stop();
        dispose_generation();
        return Err(err);
    }

    options.lifetime.adopt(Box::new(move || {
        stop();
        dispose_generation();
    }));
    Ok(fragment)
}

/// Replace the content between `start` and `end` with a fresh generation.
fn regenerate<F>(
    start: NodeId,
    end: NodeId,
    generation: &Rc<RefCell<Option<Cleanup>>>,
    render: F,
) -> Result<()>
where
    F: FnOnce() -> Result<Tree> + 'static,
{
    let stale = generation.borrow_mut().take();
    if let Some(stop_stale) = stale {
        stop_stale();
    }
    clear_between(start, end)?;

    let (tree, scope) = render_scoped(render);
    *generation.borrow_mut() = Some(scope);
    for_nodes(tree?, &mut |node| insert_before(end, node))
}

// =============================================================================
// map_observing()
// =============================================================================

type Factory<T> = Rc<dyn Fn(&T) -> Result<Tree>>;

/// One rendered but not yet inserted item.
struct Block {
    marker: NodeId,
    nodes: Vec<NodeId>,
    scope: Cleanup,
}

impl Block {
    fn insert_before(&self, end: NodeId) -> Result<()> {
        insert_before(end, self.marker)?;
        self.nodes
            .iter()
            .try_for_each(|node| insert_before(end, *node))
    }

    /// Undo a block that never made it into the list.
    fn abandon(self) {
        (self.scope)();
        let mut nodes = self.nodes;
        nodes.insert(0, self.marker);
        if let Err(err) = discard(&nodes) {
            tracing::warn!(error = %err, "map_observing: could not discard abandoned block");
        }
    }
}

/// Marker bookkeeping for one live list.
struct MarkedList<T> {
    /// One marker per item plus the trailing sentinel
    markers: Vec<NodeId>,
    /// One scope per item
    scopes: Vec<Cleanup>,
    factory: Factory<T>,
    item_label: String,
}

impl<T: Clone + 'static> MarkedList<T> {
    fn len(&self) -> usize {
        self.markers.len() - 1
    }

    fn render_item(&self, item: &T) -> (Result<Vec<NodeId>>, Cleanup) {
        let factory = self.factory.clone();
        let item = item.clone();
        let (tree, scope) = render_scoped(move || factory(&item));
        (tree.and_then(collect_nodes), scope)
    }

    /// Render every item before anything is inserted, so a failing factory
    /// leaves the DOM and the marker sequence as they were.
    fn render_blocks(&self, items: &[T]) -> Result<Vec<Block>> {
        let mut blocks = Vec::with_capacity(items.len());
        for item in items {
            let (nodes, scope) = self.render_item(item);
            match nodes {
                Ok(nodes) => blocks.push(Block {
                    marker: create_marker(self.item_label.clone()),
                    nodes,
                    scope,
                }),
                Err(err) => {
                    scope();
                    blocks.into_iter().for_each(Block::abandon);
                    return Err(err);
                }
            }
        }
        Ok(blocks)
    }

    fn splice(&mut self, index: usize, removed_count: usize, added: &[T]) -> Result<()> {
        let len = self.len();
        if index > len || removed_count > len - index {
            return Err(DomError::SpliceOutOfRange {
                index,
                removed_count,
                len,
            });
        }
        tracing::trace!(index, removed_count, added = added.len(), "map_observing: splice");

        let blocks = self.render_blocks(added)?;
        let end = self.markers[index + removed_count];

        if let Err(err) = clear_range(self.markers[index], end) {
            blocks.into_iter().for_each(Block::abandon);
            return Err(err);
        }

        let mut markers = Vec::with_capacity(blocks.len());
        let mut scopes = Vec::with_capacity(blocks.len());
        let mut inserted = Ok(());
        for block in blocks {
            if inserted.is_ok() {
                inserted = block.insert_before(end);
            }
            markers.push(block.marker);
            scopes.push(block.scope);
        }

        self.markers.splice(index..index + removed_count, markers);
        let removed: Vec<Cleanup> = self.scopes.splice(index..index + removed_count, scopes).collect();
        for stop in removed {
            stop();
        }
        inserted
    }

    /// Re-render one item between its own markers.
    fn update(&mut self, index: usize, value: &T) -> Result<()> {
        let len = self.len();
        if index >= len {
            return Err(DomError::IndexOutOfRange { index, len });
        }
        tracing::trace!(index, "map_observing: update");

        let (nodes, scope) = self.render_item(value);
        let nodes = match nodes {
            Ok(nodes) => nodes,
            Err(err) => {
                scope();
                return Err(err);
            }
        };

        let (start, end) = (self.markers[index], self.markers[index + 1]);
        if let Err(err) = clear_between(start, end) {
            scope();
            if let Err(discard_err) = discard(&nodes) {
                tracing::warn!(error = %discard_err, "map_observing: could not discard update");
            }
            return Err(err);
        }

        let stale = std::mem::replace(&mut self.scopes[index], scope);
        stale();
        nodes.iter().try_for_each(|node| insert_before(end, *node))
    }

    fn apply(&mut self, change: &ArrayChange<T>) -> Result<()> {
        match change {
            ArrayChange::Splice {
                index,
                removed_count,
                added,
            } => self.splice(*index, *removed_count, added),
            ArrayChange::Update { index, new_value } => self.update(*index, new_value),
            other => {
                tracing::error!(kind = other.kind(), "map_observing: unsupported change");
                Err(DomError::UnsupportedChange { kind: other.kind() })
            }
        }
    }

    fn stop_all(&mut self) {
        for stop in self.scopes.drain(..) {
            stop();
        }
    }
}

/// Render `array` as a live fragment, one marked block per item.
///
/// Splices remove and insert only the affected blocks. An update replaces
/// the one item's block in place. Neighbouring nodes are never touched.
///
/// Only structural changes are observed. An item that should react to its
/// own fields does so through bindings created by `factory`; those belong
/// to the item's scope and stop when the item leaves the list.
///
/// # Arguments
///
/// * `array` - The observed sequence
/// * `factory` - Renders one item; called once per inserted or updated item
/// * `lifetime` - Owner of the list; ending it stops listening and every
///   item scope
///
/// # Returns
///
/// A fragment holding one marker per item, the items' nodes and a trailing
/// sentinel. A change this list cannot apply (a move) is reported and
/// returned as an error from the mutating call.
///
/// # Example
///
/// ```ignore
/// let list = map_observing(
///     &store.todos,
///     move |todo| Ok(h("li", vec![], todo.text.clone())?),
///     Lifetime::owned(&registry),
/// )?;
/// h("ul", vec![Attr::plain("class", "todo-list")], list)?;
///
/// store.todos.push(todo)?; // one new <li>, existing rows untouched
/// ```
pub fn map_observing<T, F, R>(array: &ObservableVec<T>, factory: F, lifetime: Lifetime) -> Result<NodeId>
where
    T: Clone + 'static,
    F: Fn(&T) -> Result<R> + 'static,
    R: Into<Tree>,
{
    let marks = config();
    let fragment = create_fragment();
    let sentinel = create_marker(marks.list_end);
    append_child(fragment, sentinel)?;

    let mut list = MarkedList {
        markers: vec![sentinel],
        scopes: Vec::new(),
        factory: Rc::new(move |item: &T| factory(item).map(Into::into)),
        item_label: marks.item,
    };
    list.splice(0, 0, &array.peek_vec())?;

    let list = Rc::new(RefCell::new(list));
    let list_listener = list.clone();
    let stop_observing = array.observe(move |change| list_listener.borrow_mut().apply(change));

    lifetime.adopt(Box::new(move || {
        stop_observing();
        list.borrow_mut().stop_all();
    }));
    Ok(fragment)
}
