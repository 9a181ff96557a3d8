//! # spark-dom
//!
//! Reactive DOM rendering for Rust.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for fine-grained reactivity.
//!
//! ## Architecture
//!
//! The DOM is an arena of nodes addressed by generational [`NodeId`]s. Views
//! are built with [`h`] and kept live by signal bindings:
//!
//! ```text
//! signal.set() → binding effect → set_attribute / toggle_class / set_property
//! ObservableVec splice → map_observing → insert/clear between markers
//! ```
//!
//! Lists and conditional content are plain runs of sibling nodes delimited
//! by marker comments, so they compose with any surrounding content.
//!
//! ## Modules
//!
//! - [`types`] - Core types (NodeId, NodeKind, NodeFlags, Value)
//! - [`engine`] - Node arena, tree mutation, custom elements, serialization
//! - [`state`] - Events and observable vectors
//! - [`primitives`] - `h`, bindings, disposal, `observing`, `map_observing`
//! - [`config`] - Marker labels and clear policy
//!
//! ## Example
//!
//! ```ignore
//! use spark_dom::*;
//!
//! let todos = ObservableVec::from(vec!["buy milk", "walk dog"]);
//! let list = map_observing(&todos, |todo| h("li", vec![], *todo), Lifetime::Leak)?;
//! append_child(body(), h("ul", vec![Attr::plain("class", "todo-list")], list)?)?;
//!
//! todos.remove(0)?; // one <li> and its marker leave the document
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod primitives;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use error::{DomError, Result};

pub use config::{config, reset_config, set_clear_policy, set_config, ClearPolicy, RenderConfig};

pub use engine::{
    append_child, body, children, clear_children, create_comment, create_element,
    create_element_is, create_fragment, create_marker, create_text_node, define, document,
    flush_parked, inner_html, insert_before, node_count, outer_html, release, remove,
    reset_document, CustomElement,
};

pub use primitives::{
    clear_range, for_nodes, h, map_observing, observing, parse_attrs, Attr, AttrValue, Binding,
    Cleanup, DisposalRegistry, DisposingComponent, DisposingElement, Lifetime, ObservingOptions,
    Registry, Tag, Tree,
};

pub use state::{
    add_event_listener, dispatch_event, ArrayChange, Event, EventHandler, ObservableVec,
};
