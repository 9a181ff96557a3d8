//! DOM Engine - Node arena, tree mutation, custom elements.
//!
//! The engine manages the core data structures:
//! - Registry: slot allocation, generational handles, root/body
//! - Mutation: insert/remove with connection tracking and lifecycle callbacks
//! - Attributes: attributes, properties, style, class list, text
//! - Custom: custom element definitions and the lifecycle trait
//! - Serialize: HTML output for debugging and comparison
//!
//! # Architecture
//!
//! Nodes are NOT objects. They are generational indices into one arena per
//! thread:
//!
//! ```text
//! #0  Document  (connected)
//! #1  <body>    (parent=#0, connected)
//! #2  <ul>      (parent=#1, connected)
//! #3  <!--|-->  (parent=#2, marker)
//! ```
//!
//! A parent owns its children through explicit sibling links. Nothing is
//! reclaimed implicitly: a node lives until [`release`] frees its subtree.

mod attributes;
mod custom;
mod mutation;
mod registry;
mod serialize;

pub use attributes::*;
pub use custom::*;
pub use mutation::*;
pub use registry::*;
pub use serialize::*;

pub(crate) use mutation::discard;
