//! Core types for spark-dom.
//!
//! These types define the foundation that everything builds on: node handles
//! into the document arena, node kinds, per-node flags, and the dynamic
//! [`Value`] that properties and reactive bindings carry.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

// =============================================================================
// Node Handle
// =============================================================================

/// Handle to a node in the document arena.
///
/// Handles are cheap to copy. When a node is released its slot is reused with
/// a bumped generation, so an old handle never aliases the new node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Arena slot index.
    #[inline]
    pub const fn index(&self) -> usize {
        self.index as usize
    }

    /// Slot generation this handle was issued for.
    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

// =============================================================================
// Node Kind
// =============================================================================

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document root. Exactly one per document, always connected.
    Document,
    /// An element, optionally a customized built-in (`is`).
    Element { tag: String, is: Option<String> },
    /// Character data.
    Text(String),
    /// Comment. Markers are comments with [`NodeFlags::MARKER`] set.
    Comment(String),
    /// Ownerless container whose children move out when it is inserted.
    Fragment,
}

impl NodeKind {
    /// Whether nodes of this kind may hold children.
    pub fn accepts_children(&self) -> bool {
        matches!(self, NodeKind::Document | NodeKind::Element { .. } | NodeKind::Fragment)
    }

    /// Lowercase tag name for elements.
    pub fn tag(&self) -> Option<&str> {
        match self {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }
}

bitflags! {
    /// Per-node state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u8 {
        /// Node is reachable from the document root.
        const CONNECTED = 1 << 0;
        /// Comment used purely as a positional anchor.
        const MARKER    = 1 << 1;
        /// Element was created with a custom element behavior attached.
        const CUSTOM    = 1 << 2;
    }
}

// =============================================================================
// Value
// =============================================================================

/// Dynamic value carried by properties and reactive bindings.
///
/// `Object` holds arbitrary shared data (e.g. a model handed to a custom
/// element through `prop:`), compared by pointer identity.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Object(Rc<dyn Any>),
}

impl Value {
    /// Wrap shared data as an object value.
    pub fn object<T: 'static>(value: Rc<T>) -> Self {
        Value::Object(value)
    }

    /// Truthiness in the usual scripting sense: null, false, 0, NaN and ""
    /// are false, everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Downcast an object value to shared data of type `T`.
    pub fn downcast<T: 'static>(&self) -> Option<Rc<T>> {
        match self {
            Value::Object(obj) => obj.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    /// String form used when a value is written to an attribute or text.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::Text(s) => s.clone(),
            Value::Object(_) => "[object]".to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Text(s) => write!(f, "Text({s:?})"),
            Value::Object(_) => write!(f, "Object(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::from(3).is_truthy());
        assert!(Value::object(Rc::new(())).is_truthy());
    }

    #[test]
    fn test_number_text_form() {
        assert_eq!(Value::from(2).to_text(), "2");
        assert_eq!(Value::from(2.5).to_text(), "2.5");
        assert_eq!(Value::Null.to_text(), "");
    }

    #[test]
    fn test_object_identity_and_downcast() {
        let shared = Rc::new(String::from("todo"));
        let a = Value::object(shared.clone());
        let b = Value::object(shared.clone());
        let c = Value::object(Rc::new(String::from("todo")));

        assert_eq!(a, b);
        assert_ne!(a, c, "objects compare by identity");
        assert_eq!(a.downcast::<String>().as_deref(), Some(&"todo".to_string()));
        assert!(a.downcast::<u32>().is_none());
    }
}
