//! Element Builder - `h(tag, attrs, children)`.
//!
//! Builds one element from a tag, a list of [`Attr`]s and child content.
//! Attributes are applied in order, then children are appended.
//!
//! ```ignore
//! let registry = DisposalRegistry::new();
//! let checkbox = h(
//!     "input",
//!     vec![
//!         Attr::plain("type", "checkbox"),
//!         Attr::plain("class", "toggle"),
//!         Attr::on("change", move |_| todo.toggle()),
//!         Attr::obs_prop("checked", Binding::owned(&registry, move || todo.completed())),
//!     ],
//!     (),
//! )?;
//! ```
//!
//! # Observed attributes
//!
//! `Obs*` attributes run their [`Binding`] inside an effect. The first run
//! happens before `h` returns; later runs follow every change of a signal
//! the observation read. The effect's stop function goes to the binding's
//! [`Lifetime`].
//!
//! # Qualified names
//!
//! [`Attr::parse`] maps `qualifier:key` names onto the variants:
//!
//! | name | variant |
//! |---|---|
//! | `key` | [`Attr::Plain`] (`is` becomes [`Attr::Is`]) |
//! | `prop:key` | [`Attr::Prop`] |
//! | `style:key` | [`Attr::Style`] |
//! | `class:key` | [`Attr::Class`] |
//! | `obs:key`, `obs-prop:key`, `obs-style:key`, `obs-class:key` | the `Obs*` variants |
//! | `on:key` | [`Attr::On`] |
//! | `on_:key` | [`Attr::OnPassive`] |

use std::rc::Rc;

use spark_signals::effect;

use crate::engine::{
    append_child, create_custom_element, create_element_is, create_text_node, remove_attribute,
    set_attribute, set_property, set_style, toggle_class, CustomElement,
};
use crate::error::{DomError, Result};
use crate::primitives::{for_nodes, Binding, Tree};
use crate::state::{add_handler, Event, EventHandler};
use crate::types::{NodeId, Value};

// =============================================================================
// Tag
// =============================================================================

/// What `h` creates.
#[derive(Clone)]
pub enum Tag {
    /// An element by tag name. Honors [`Attr::Is`].
    Name(String),
    /// Anything else that produces a node.
    Constructor(Rc<dyn Fn() -> Result<NodeId>>),
}

impl Tag {
    /// An empty text node. Pair with `obs-prop:data`.
    pub fn text_node() -> Self {
        Tag::Constructor(Rc::new(|| Ok(create_text_node(""))))
    }

    /// A custom element referenced by type rather than by definition name.
    pub fn custom<F>(tag: &str, behavior: F) -> Self
    where
        F: Fn() -> Rc<dyn CustomElement> + 'static,
    {
        let tag = tag.to_string();
        Tag::Constructor(Rc::new(move || Ok(create_custom_element(&tag, behavior()))))
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Tag::Name(name.to_string())
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Tag::Name(name)
    }
}

impl std::fmt::Debug for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tag::Name(name) => write!(f, "Tag::Name({name:?})"),
            Tag::Constructor(_) => f.write_str("Tag::Constructor"),
        }
    }
}

// =============================================================================
// Attr
// =============================================================================

/// One attribute binding.
#[derive(Clone)]
pub enum Attr {
    /// Customized built-in specifier, consumed at creation for named tags
    Is(String),
    /// `setAttribute(key, value)`
    Plain(String, String),
    /// Direct property assignment
    Prop(String, Value),
    /// One inline style property
    Style(String, String),
    /// Class on/off
    Class(String, bool),
    /// Observed attribute
    Obs(String, Binding),
    /// Observed property
    ObsProp(String, Binding),
    /// Observed style property
    ObsStyle(String, Binding),
    /// Observed class toggle
    ObsClass(String, Binding),
    /// Consuming listener: prevents default and stops propagation first
    On(String, EventHandler),
    /// Plain listener
    OnPassive(String, EventHandler),
}

impl Attr {
    pub fn plain(key: &str, value: impl Into<String>) -> Self {
        Attr::Plain(key.to_string(), value.into())
    }

    pub fn prop(key: &str, value: impl Into<Value>) -> Self {
        Attr::Prop(key.to_string(), value.into())
    }

    pub fn style(key: &str, value: impl Into<String>) -> Self {
        Attr::Style(key.to_string(), value.into())
    }

    pub fn class(key: &str, on: bool) -> Self {
        Attr::Class(key.to_string(), on)
    }

    pub fn obs(key: &str, binding: Binding) -> Self {
        Attr::Obs(key.to_string(), binding)
    }

    pub fn obs_prop(key: &str, binding: Binding) -> Self {
        Attr::ObsProp(key.to_string(), binding)
    }

    pub fn obs_style(key: &str, binding: Binding) -> Self {
        Attr::ObsStyle(key.to_string(), binding)
    }

    pub fn obs_class(key: &str, binding: Binding) -> Self {
        Attr::ObsClass(key.to_string(), binding)
    }

    pub fn on<F: Fn(&mut Event) + 'static>(kind: &str, handler: F) -> Self {
        Attr::On(kind.to_string(), Rc::new(handler))
    }

    pub fn on_passive<F: Fn(&mut Event) + 'static>(kind: &str, handler: F) -> Self {
        Attr::OnPassive(kind.to_string(), Rc::new(handler))
    }

    /// The unqualified key.
    pub fn key(&self) -> &str {
        match self {
            Attr::Is(_) => "is",
            Attr::Plain(key, _)
            | Attr::Prop(key, _)
            | Attr::Style(key, _)
            | Attr::Class(key, _)
            | Attr::Obs(key, _)
            | Attr::ObsProp(key, _)
            | Attr::ObsStyle(key, _)
            | Attr::ObsClass(key, _)
            | Attr::On(key, _)
            | Attr::OnPassive(key, _) => key,
        }
    }
}

impl std::fmt::Debug for Attr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attr::Is(is) => write!(f, "Is({is:?})"),
            Attr::Plain(k, v) => write!(f, "Plain({k:?}, {v:?})"),
            Attr::Prop(k, v) => write!(f, "Prop({k:?}, {v:?})"),
            Attr::Style(k, v) => write!(f, "Style({k:?}, {v:?})"),
            Attr::Class(k, on) => write!(f, "Class({k:?}, {on})"),
            Attr::Obs(k, _) => write!(f, "Obs({k:?})"),
            Attr::ObsProp(k, _) => write!(f, "ObsProp({k:?})"),
            Attr::ObsStyle(k, _) => write!(f, "ObsStyle({k:?})"),
            Attr::ObsClass(k, _) => write!(f, "ObsClass({k:?})"),
            Attr::On(k, _) => write!(f, "On({k:?})"),
            Attr::OnPassive(k, _) => write!(f, "OnPassive({k:?})"),
        }
    }
}

// =============================================================================
// h()
// =============================================================================

/// Build one node, apply its attributes and append its children.
///
/// For [`Tag::Name`] the first [`Attr::Is`] selects a customized built-in
/// and is not applied again; for constructors it is a plain attribute.
/// Reactive attributes (`Obs*`) apply their current value immediately and
/// follow every later change until their binding's lifetime ends.
///
/// # Arguments
///
/// * `tag` - Element name, or a constructor that creates the node
/// * `attrs` - Attributes in application order
/// * `children` - Anything convertible to a [`Tree`], flattened in order
///
/// # Returns
///
/// The new, still detached node. Errors from the constructor or from
/// appending a child (for example a child that is an ancestor) are returned.
///
/// # Example
///
/// ```ignore
/// use spark_dom::{h, Attr, Binding};
/// use spark_signals::signal;
///
/// let done = signal(false);
/// let done_clone = done.clone();
///
/// let row = h(
///     "li",
///     vec![
///         Attr::plain("class", "todo"),
///         Attr::obs_class("completed", Binding::leaked(move || done_clone.get())),
///         Attr::on("click", |_| {}),
///     ],
///     "Buy milk",
/// )?;
///
/// done.set(true); // <li class="todo completed">Buy milk</li>
/// ```
pub fn h(tag: impl Into<Tag>, attrs: Vec<Attr>, children: impl Into<Tree>) -> Result<NodeId> {
    let tag = tag.into();
    let (element, named) = match &tag {
        Tag::Name(name) => {
            let is = attrs.iter().find_map(|attr| match attr {
                Attr::Is(is) => Some(is.as_str()),
                _ => None,
            });
            (create_element_is(name, is), true)
        }
        Tag::Constructor(construct) => (construct()?, false),
    };

    for attr in attrs {
        apply(element, attr, named);
    }

    for_nodes(children.into(), &mut |child| append_child(element, child))?;
    Ok(element)
}

fn apply(element: NodeId, attr: Attr, named: bool) {
    match attr {
        Attr::Is(_) if named => {}
        Attr::Is(is) => set_attribute(element, "is", is),
        Attr::Plain(key, value) => set_attribute(element, &key, value),
        Attr::Prop(key, value) => set_property(element, &key, value),
        Attr::Style(key, value) => set_style(element, &key, value),
        Attr::Class(key, on) => toggle_class(element, &key, on),
        Attr::Obs(key, binding) => bind(binding, move |value| match value {
            Value::Null | Value::Bool(false) => remove_attribute(element, &key),
            Value::Bool(true) => set_attribute(element, &key, ""),
            other => set_attribute(element, &key, other.to_text()),
        }),
        Attr::ObsProp(key, binding) => bind(binding, move |value| set_property(element, &key, value)),
        Attr::ObsStyle(key, binding) => bind(binding, move |value| {
            let css = if value.is_null() { String::new() } else { value.to_text() };
            set_style(element, &key, css);
        }),
        Attr::ObsClass(key, binding) => bind(binding, move |value| {
            toggle_class(element, &key, value.is_truthy())
        }),
        Attr::On(kind, handler) => {
            let consuming: EventHandler = Rc::new(move |event: &mut Event| {
                event.prevent_default();
                event.stop_immediate_propagation();
                handler(event);
            });
            // The listener is dropped when the element is released.
            let _ = add_handler(element, &kind, consuming);
        }
        Attr::OnPassive(kind, handler) => {
            // Same: released with the element.
            let _ = add_handler(element, &kind, handler);
        }
    }
}

/// Run `update(observe())` now and after every dependency change.
fn bind<U>(binding: Binding, update: U)
where
    U: Fn(Value) + 'static,
{
    let Binding { observe, lifetime } = binding;
    let stop = effect(move || update(observe()));
    lifetime.adopt(Box::new(stop));
}

// =============================================================================
// Qualified attribute names
// =============================================================================

/// Untyped attribute value, as given next to a `qualifier:key` name.
#[derive(Clone)]
pub enum AttrValue {
    Value(Value),
    Binding(Binding),
    Handler(EventHandler),
}

impl AttrValue {
    pub fn handler<F: Fn(&mut Event) + 'static>(handler: F) -> Self {
        AttrValue::Handler(Rc::new(handler))
    }

    fn kind(&self) -> &'static str {
        match self {
            AttrValue::Value(_) => "value",
            AttrValue::Binding(_) => "binding",
            AttrValue::Handler(_) => "handler",
        }
    }
}

macro_rules! attr_value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for AttrValue {
                fn from(value: $ty) -> Self {
                    AttrValue::Value(value.into())
                }
            }
        )*
    };
}

attr_value_from!(Value, bool, f64, i32, i64, usize, &str, String);

impl From<Binding> for AttrValue {
    fn from(binding: Binding) -> Self {
        AttrValue::Binding(binding)
    }
}

impl Attr {
    /// Resolve a possibly qualified attribute name.
    ///
    /// An unknown qualifier is an error. A value of the wrong shape for its
    /// qualifier is reported and skipped (`Ok(None)`).
    pub fn parse(name: &str, value: AttrValue) -> Result<Option<Attr>> {
        let Some((qualifier, key)) = name.split_once(':') else {
            return Ok(match (name, value) {
                ("is", AttrValue::Value(v)) => Some(Attr::Is(v.to_text())),
                (_, AttrValue::Value(v)) => Some(Attr::Plain(name.to_string(), v.to_text())),
                (_, other) => mismatch(name, &other, "plain attribute"),
            });
        };
        let key = key.to_string();

        let attr = match (qualifier, value) {
            ("prop", AttrValue::Value(v)) => Attr::Prop(key, v),
            ("style", AttrValue::Value(v)) => Attr::Style(key, v.to_text()),
            ("class", AttrValue::Value(v)) => Attr::Class(key, v.is_truthy()),
            ("obs", AttrValue::Binding(b)) => Attr::Obs(key, b),
            ("obs-prop", AttrValue::Binding(b)) => Attr::ObsProp(key, b),
            ("obs-style", AttrValue::Binding(b)) => Attr::ObsStyle(key, b),
            ("obs-class", AttrValue::Binding(b)) => Attr::ObsClass(key, b),
            ("on", AttrValue::Handler(h)) => Attr::On(key, h),
            ("on_", AttrValue::Handler(h)) => Attr::OnPassive(key, h),
            ("obs" | "obs-prop" | "obs-style" | "obs-class", other) => {
                tracing::error!(attribute = name, got = other.kind(), "bad 'obs-...' attribute");
                return Ok(None);
            }
            ("prop" | "style" | "class", other) => {
                return Ok(mismatch(name, &other, "value"));
            }
            ("on" | "on_", other) => return Ok(mismatch(name, &other, "handler")),
            (qualifier, _) => {
                return Err(DomError::UnsupportedQualifier {
                    qualifier: qualifier.to_string(),
                });
            }
        };
        Ok(Some(attr))
    }
}

fn mismatch(name: &str, value: &AttrValue, expected: &str) -> Option<Attr> {
    tracing::error!(attribute = name, got = value.kind(), expected, "attribute value has the wrong shape");
    None
}

/// Parse a list of `(name, value)` pairs, dropping reported ones.
pub fn parse_attrs<I, N>(pairs: I) -> Result<Vec<Attr>>
where
    I: IntoIterator<Item = (N, AttrValue)>,
    N: AsRef<str>,
{
    let mut attrs = Vec::new();
    for (name, value) in pairs {
        if let Some(attr) = Attr::parse(name.as_ref(), value)? {
            attrs.push(attr);
        }
    }
    Ok(attrs)
}
