//! DOM Primitives - Building blocks for reactive views.
//!
//! - [`h`] - Build one element from a tag, attributes and children
//! - [`for_nodes`] - Flatten a [`Tree`] into nodes
//! - [`observing`] - Reactive range, re-rendered wholesale
//! - [`map_observing`] - Live list from an [`ObservableVec`](crate::state::ObservableVec)
//! - [`DisposalRegistry`] - Cleanups run when an element leaves the document
//!
//! # Lifetimes
//!
//! Every reactive construct takes a [`Lifetime`]: either a registry that
//! stops it, or an explicit [`Lifetime::Leak`].
//!
//! ```ignore
//! // Stopped when the todo-item leaves the document
//! Attr::obs_class("editing", Binding::owned(&registry, move || editing.get()))
//!
//! // Top-level content that lives forever
//! Attr::obs_class("hidden", Binding::leaked(move || todos.is_empty()))
//! ```

mod control_flow;
mod disposal;
mod element;
mod tree;
mod types;

pub use control_flow::{clear_range, map_observing, observing, ObservingOptions};
pub use disposal::{DisposalRegistry, DisposingComponent, DisposingElement, Registry};
pub use element::{h, parse_attrs, Attr, AttrValue, Tag};
pub use tree::for_nodes;
pub use types::*;
