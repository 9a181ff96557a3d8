//! ObservableVec - A vector that reports its structural changes.
//!
//! Two ways to consume it:
//!
//! - **Reactive reads** (`len`, `get`, `to_vec`, `with`) track a version
//!   signal, so any effect reading the vector re-runs after every mutation.
//! - **Change listeners** ([`ObservableVec::observe`]) receive one
//!   [`ArrayChange`] per mutation, synchronously, in registration order.
//!   List rendering is built on these.
//!
//! ```ignore
//! let todos = ObservableVec::from(vec!["buy milk", "walk dog"]);
//! let stop = todos.observe(|change| {
//!     println!("{change:?}");
//!     Ok(())
//! });
//! todos.remove(0)?; // Splice { index: 0, removed_count: 1, added: [] }
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_signals::{signal, Signal};

use crate::error::{DomError, Result};

// =============================================================================
// CHANGE EVENTS
// =============================================================================

/// One structural change.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayChange<T> {
    /// `removed_count` items at `index` replaced by `added`
    Splice {
        index: usize,
        removed_count: usize,
        added: Vec<T>,
    },
    /// Item at `index` replaced
    Update { index: usize, new_value: T },
    /// Item moved from `from` to `to`
    Move { from: usize, to: usize },
}

impl<T> ArrayChange<T> {
    pub fn kind(&self) -> &'static str {
        match self {
            ArrayChange::Splice { .. } => "splice",
            ArrayChange::Update { .. } => "update",
            ArrayChange::Move { .. } => "move",
        }
    }
}

type Listener<T> = Rc<dyn Fn(&ArrayChange<T>) -> Result<()>>;

struct Inner<T> {
    items: RefCell<Vec<T>>,
    version: Signal<u64>,
    revision: Cell<u64>,
    listeners: RefCell<Vec<(usize, Listener<T>)>>,
    next_listener: Cell<usize>,
}

// =============================================================================
// OBSERVABLE VEC
// =============================================================================

/// Shared, observable vector. Cloning yields another handle to the same items.
pub struct ObservableVec<T: Clone + 'static> {
    inner: Rc<Inner<T>>,
}

impl<T: Clone + 'static> Clone for ObservableVec<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Default for ObservableVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> From<Vec<T>> for ObservableVec<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            inner: Rc::new(Inner {
                items: RefCell::new(items),
                version: signal(0),
                revision: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
            }),
        }
    }
}

impl<T: Clone + 'static> ObservableVec<T> {
    pub fn new() -> Self {
        Self::from(Vec::new())
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    fn track(&self) {
        let _ = self.inner.version.get();
    }

    pub fn len(&self) -> usize {
        self.track();
        self.peek_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.track();
        self.inner.items.borrow().get(index).cloned()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.track();
        self.peek_vec()
    }

    /// Borrow the items for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.track();
        f(&self.inner.items.borrow())
    }

    /// Length without tracking.
    pub fn peek_len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    /// Snapshot without tracking.
    pub fn peek_vec(&self) -> Vec<T> {
        self.inner.items.borrow().clone()
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    pub fn push(&self, item: T) -> Result<()> {
        let index = self.peek_len();
        self.splice(index, 0, vec![item]).map(|_| ())
    }

    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        self.splice(index, 0, vec![item]).map(|_| ())
    }

    pub fn remove(&self, index: usize) -> Result<T> {
        let len = self.peek_len();
        if index >= len {
            return Err(DomError::IndexOutOfRange { index, len });
        }
        let mut removed = self.splice(index, 1, Vec::new())?;
        removed.pop().ok_or(DomError::IndexOutOfRange { index, len })
    }

    /// Replace `removed_count` items at `index` with `added`.
    /// Returns the removed items.
    pub fn splice(&self, index: usize, removed_count: usize, added: Vec<T>) -> Result<Vec<T>> {
        let len = self.peek_len();
        if index > len || removed_count > len - index {
            return Err(DomError::SpliceOutOfRange {
                index,
                removed_count,
                len,
            });
        }
        if removed_count == 0 && added.is_empty() {
            return Ok(Vec::new());
        }

        let removed: Vec<T> = self
            .inner
            .items
            .borrow_mut()
            .splice(index..index + removed_count, added.iter().cloned())
            .collect();

        self.notify(ArrayChange::Splice {
            index,
            removed_count,
            added,
        })?;
        Ok(removed)
    }

    /// Replace the item at `index`. Returns the previous value.
    pub fn set(&self, index: usize, value: T) -> Result<T> {
        let previous = {
            let mut items = self.inner.items.borrow_mut();
            let len = items.len();
            let slot = items
                .get_mut(index)
                .ok_or(DomError::IndexOutOfRange { index, len })?;
            std::mem::replace(slot, value.clone())
        };
        self.notify(ArrayChange::Update {
            index,
            new_value: value,
        })?;
        Ok(previous)
    }

    pub fn clear(&self) -> Result<()> {
        let len = self.peek_len();
        self.splice(0, len, Vec::new()).map(|_| ())
    }

    /// Keep only the items matching `keep`.
    ///
    /// Emits one splice per contiguous run of removed items, highest index
    /// first, so each index is valid when its change is delivered.
    pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) -> Result<()> {
        let flags: Vec<bool> = self.inner.items.borrow().iter().map(&mut keep).collect();

        let mut runs = Vec::new();
        let mut i = 0;
        while i < flags.len() {
            if flags[i] {
                i += 1;
                continue;
            }
            let start = i;
            while i < flags.len() && !flags[i] {
                i += 1;
            }
            runs.push((start, i - start));
        }

        for (start, count) in runs.into_iter().rev() {
            self.splice(start, count, Vec::new())?;
        }
        Ok(())
    }

    /// Move the item at `from` so it ends up at index `to`.
    pub fn move_item(&self, from: usize, to: usize) -> Result<()> {
        {
            let mut items = self.inner.items.borrow_mut();
            let len = items.len();
            if from >= len {
                return Err(DomError::IndexOutOfRange { index: from, len });
            }
            if to >= len {
                return Err(DomError::IndexOutOfRange { index: to, len });
            }
            if from == to {
                return Ok(());
            }
            let item = items.remove(from);
            items.insert(to, item);
        }
        self.notify(ArrayChange::Move { from, to })
    }

    // -------------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------------

    /// Register a change listener. Returns cleanup function.
    pub fn observe<F>(&self, listener: F) -> impl FnOnce() + use<F, T>
    where
        F: Fn(&ArrayChange<T>) -> Result<()> + 'static,
    {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));

        let inner = Rc::downgrade(&self.inner);
        move || {
            if let Some(inner) = inner.upgrade() {
                inner
                    .listeners
                    .borrow_mut()
                    .retain(|(listener_id, _)| *listener_id != id);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn notify(&self, change: ArrayChange<T>) -> Result<()> {
        tracing::trace!(kind = change.kind(), "array change");

        // Snapshot so listeners may subscribe or unsubscribe while running.
        let listeners: Vec<Listener<T>> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        let result = listeners.iter().try_for_each(|listener| listener(&change));

        let revision = self.inner.revision.get() + 1;
        self.inner.revision.set(revision);
        self.inner.version.set(revision);
        result
    }
}

impl<T: Clone + std::fmt::Debug + 'static> std::fmt::Debug for ObservableVec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.inner.items.borrow().iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use spark_signals::effect;

    use super::*;

    fn recorded(vec: &ObservableVec<&'static str>) -> Rc<RefCell<Vec<ArrayChange<&'static str>>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = log.clone();
        let stop = vec.observe(move |change| {
            log_clone.borrow_mut().push(change.clone());
            Ok(())
        });
        std::mem::forget(stop);
        log
    }

    #[test]
    fn test_splice_reports_change() {
        let todos = ObservableVec::from(vec!["a", "b", "c"]);
        let log = recorded(&todos);

        let removed = todos.splice(1, 1, vec!["x", "y"]).unwrap();
        assert_eq!(removed, vec!["b"]);
        assert_eq!(todos.peek_vec(), vec!["a", "x", "y", "c"]);
        assert_eq!(
            *log.borrow(),
            vec![ArrayChange::Splice {
                index: 1,
                removed_count: 1,
                added: vec!["x", "y"],
            }]
        );
    }

    #[test]
    fn test_out_of_range_fails_before_listeners() {
        let todos = ObservableVec::from(vec!["a"]);
        let log = recorded(&todos);

        assert_eq!(
            todos.splice(1, 1, vec![]),
            Err(DomError::SpliceOutOfRange {
                index: 1,
                removed_count: 1,
                len: 1,
            })
        );
        assert_eq!(
            todos.set(3, "z"),
            Err(DomError::IndexOutOfRange { index: 3, len: 1 })
        );
        assert!(log.borrow().is_empty());
        assert_eq!(todos.peek_vec(), vec!["a"]);
    }

    #[test]
    fn test_set_reports_update() {
        let todos = ObservableVec::from(vec!["a", "b"]);
        let log = recorded(&todos);

        assert_eq!(todos.set(1, "B"), Ok("b"));
        assert_eq!(
            *log.borrow(),
            vec![ArrayChange::Update {
                index: 1,
                new_value: "B",
            }]
        );
    }

    #[test]
    fn test_retain_emits_runs_from_the_back() {
        let todos = ObservableVec::from(vec!["a", "x", "x", "b", "x"]);
        let log = recorded(&todos);

        todos.retain(|item| *item != "x").unwrap();
        assert_eq!(todos.peek_vec(), vec!["a", "b"]);
        assert_eq!(
            *log.borrow(),
            vec![
                ArrayChange::Splice {
                    index: 4,
                    removed_count: 1,
                    added: vec![],
                },
                ArrayChange::Splice {
                    index: 1,
                    removed_count: 2,
                    added: vec![],
                },
            ]
        );
    }

    #[test]
    fn test_move_item() {
        let todos = ObservableVec::from(vec!["a", "b", "c"]);
        let log = recorded(&todos);

        todos.move_item(0, 2).unwrap();
        assert_eq!(todos.peek_vec(), vec!["b", "c", "a"]);
        assert_eq!(*log.borrow(), vec![ArrayChange::Move { from: 0, to: 2 }]);
    }

    #[test]
    fn test_listener_error_aborts_remaining() {
        let todos = ObservableVec::from(vec![1, 2]);
        let reached = Rc::new(Cell::new(false));
        let reached_clone = reached.clone();

        let _a = todos.observe(|_| Err(DomError::UnsupportedChange { kind: "splice" }));
        let _b = todos.observe(move |_| {
            reached_clone.set(true);
            Ok(())
        });

        assert_eq!(
            todos.push(3),
            Err(DomError::UnsupportedChange { kind: "splice" })
        );
        assert!(!reached.get());
        assert_eq!(todos.peek_vec(), vec![1, 2, 3], "mutation itself stays applied");
    }

    #[test]
    fn test_observe_cleanup() {
        let todos = ObservableVec::from(vec![1]);
        let stop = todos.observe(|_| Ok(()));
        assert_eq!(todos.listener_count(), 1);
        stop();
        assert_eq!(todos.listener_count(), 0);
    }

    #[test]
    fn test_reactive_len() {
        let todos = ObservableVec::from(vec!["a"]);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let todos_clone = todos.clone();
        let seen_clone = seen.clone();
        let _stop = effect(move || {
            seen_clone.borrow_mut().push(todos_clone.len());
        });

        todos.push("b").unwrap();
        todos.clear().unwrap();
        assert_eq!(*seen.borrow(), vec![1, 2, 0]);
    }
}
