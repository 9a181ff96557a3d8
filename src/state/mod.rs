//! State Module - Runtime state shared by the rendering primitives
//!
//! - **Events** - Event type, listener registry, bubbling dispatch
//! - **ObservableVec** - Vector that reports splice/update changes and
//!   tracks reads through a version signal

mod events;
mod observable_vec;

pub use events::*;
pub use observable_vec::*;
