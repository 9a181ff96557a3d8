//! Attributes, properties, inline style and class list.
//!
//! Writes to a stale handle are ignored with a warning; these setters are
//! called from reactive bindings that may outlive their node.

use super::registry::{with_document, with_document_mut, NodeData};
use crate::types::{NodeId, NodeKind, Value};

fn write(id: NodeId, what: &str, f: impl FnOnce(&mut NodeData)) {
    let applied = with_document_mut(|doc| doc.get_mut(id).map(f).is_some());
    if !applied {
        tracing::warn!(node = %id, what, "write to stale node ignored");
    }
}

// =============================================================================
// Attributes
// =============================================================================

pub fn set_attribute(id: NodeId, name: &str, value: impl Into<String>) {
    let value = value.into();
    write(id, "attribute", |node| {
        node.attributes.insert(name.to_string(), value);
    });
}

pub fn remove_attribute(id: NodeId, name: &str) {
    write(id, "attribute", |node| {
        node.attributes.shift_remove(name);
    });
}

pub fn attribute(id: NodeId, name: &str) -> Option<String> {
    with_document(|doc| doc.get(id).and_then(|n| n.attributes.get(name).cloned()))
}

pub fn has_attribute(id: NodeId, name: &str) -> bool {
    attribute(id, name).is_some()
}

/// All attributes in insertion order.
pub fn attributes(id: NodeId) -> Vec<(String, String)> {
    with_document(|doc| {
        doc.get(id)
            .map(|n| {
                n.attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    })
}

// =============================================================================
// Class List
// =============================================================================

/// Add or remove `class` depending on `force`. Backed by the `class`
/// attribute, which is dropped once the list is empty.
pub fn toggle_class(id: NodeId, class: &str, force: bool) {
    write(id, "class", |node| {
        let mut classes: Vec<String> = node
            .attributes
            .get("class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        let present = classes.iter().any(|c| c == class);
        match (present, force) {
            (false, true) => classes.push(class.to_string()),
            (true, false) => classes.retain(|c| c != class),
            _ => return,
        }
        if classes.is_empty() {
            node.attributes.shift_remove("class");
        } else {
            node.attributes.insert("class".to_string(), classes.join(" "));
        }
    });
}

pub fn has_class(id: NodeId, class: &str) -> bool {
    attribute(id, "class").is_some_and(|c| c.split_whitespace().any(|c| c == class))
}

// =============================================================================
// Inline Style
// =============================================================================

/// Set one style property. An empty value removes it.
pub fn set_style(id: NodeId, name: &str, value: impl Into<String>) {
    let value = value.into();
    write(id, "style", |node| {
        if value.is_empty() {
            node.style.shift_remove(name);
        } else {
            node.style.insert(name.to_string(), value);
        }
    });
}

pub fn style(id: NodeId, name: &str) -> Option<String> {
    with_document(|doc| doc.get(id).and_then(|n| n.style.get(name).cloned()))
}

// =============================================================================
// Properties
// =============================================================================

/// Assign a property.
///
/// Two properties write through to the tree: `data` on text and comment
/// nodes replaces the character data, and `textContent` on an element
/// replaces its children with a single text node.
pub fn set_property(id: NodeId, name: &str, value: impl Into<Value>) {
    let value = value.into();
    if name == "textContent" && matches!(super::kind(id), Some(NodeKind::Element { .. })) {
        set_text_content(id, &value.to_text());
        return;
    }
    write(id, "property", |node| match (&mut node.kind, name) {
        (NodeKind::Text(data) | NodeKind::Comment(data), "data") => {
            *data = value.to_text();
        }
        _ => {
            node.properties.insert(name.to_string(), value);
        }
    });
}

/// Read a property. `data` on character data nodes reads the text.
pub fn property(id: NodeId, name: &str) -> Option<Value> {
    with_document(|doc| {
        let node = doc.get(id)?;
        match (&node.kind, name) {
            (NodeKind::Text(data) | NodeKind::Comment(data), "data") => {
                Some(Value::Text(data.clone()))
            }
            _ => node.properties.get(name).cloned(),
        }
    })
}

/// Read an object property as shared data of type `T`.
pub fn property_as<T: 'static>(id: NodeId, name: &str) -> Option<std::rc::Rc<T>> {
    property(id, name).and_then(|v| v.downcast::<T>())
}

// =============================================================================
// Text
// =============================================================================

/// Character data of a text or comment node.
pub fn text(id: NodeId) -> Option<String> {
    with_document(|doc| match &doc.get(id)?.kind {
        NodeKind::Text(data) | NodeKind::Comment(data) => Some(data.clone()),
        _ => None,
    })
}

/// Concatenated text of all descendant text nodes. Comments do not count.
pub fn text_content(id: NodeId) -> String {
    with_document(|doc| {
        doc.inclusive_descendants(id)
            .into_iter()
            .filter_map(|n| match &doc.get(n)?.kind {
                NodeKind::Text(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    })
}

fn set_text_content(id: NodeId, text: &str) {
    if let Err(err) = super::clear_children(id) {
        tracing::warn!(node = %id, error = %err, "textContent on stale node ignored");
        return;
    }
    if !text.is_empty() {
        let node = super::create_text_node(text);
        if let Err(err) = super::append_child(id, node) {
            tracing::warn!(node = %id, error = %err, "textContent append failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::engine::{append_child, children, create_element, create_text_node, reset_document};

    #[test]
    fn test_attributes_keep_order() {
        reset_document();

        let input = create_element("input");
        set_attribute(input, "type", "checkbox");
        set_attribute(input, "class", "toggle");
        assert_eq!(
            attributes(input),
            vec![
                ("type".to_string(), "checkbox".to_string()),
                ("class".to_string(), "toggle".to_string()),
            ]
        );
        remove_attribute(input, "type");
        assert!(!has_attribute(input, "type"));
    }

    #[test]
    fn test_toggle_class() {
        reset_document();

        let li = create_element("li");
        toggle_class(li, "editing", true);
        toggle_class(li, "completed", true);
        toggle_class(li, "editing", true);
        assert_eq!(attribute(li, "class").as_deref(), Some("editing completed"));

        toggle_class(li, "editing", false);
        assert!(!has_class(li, "editing"));
        toggle_class(li, "completed", false);
        assert_eq!(attribute(li, "class"), None, "empty class list drops attribute");
    }

    #[test]
    fn test_style_empty_removes() {
        reset_document();

        let form = create_element("form");
        set_style(form, "display", "contents");
        assert_eq!(style(form, "display").as_deref(), Some("contents"));
        set_style(form, "display", "");
        assert_eq!(style(form, "display"), None);
    }

    #[test]
    fn test_text_data_property() {
        reset_document();

        let text_node = create_text_node("");
        set_property(text_node, "data", "2 items left");
        assert_eq!(text(text_node).as_deref(), Some("2 items left"));
        assert_eq!(property(text_node, "data"), Some(Value::from("2 items left")));
    }

    #[test]
    fn test_text_content_replaces_children() {
        reset_document();

        let label = create_element("label");
        append_child(label, create_text_node("old")).unwrap();
        append_child(label, create_element("b")).unwrap();

        set_property(label, "textContent", "new");
        assert_eq!(children(label).len(), 1);
        assert_eq!(text_content(label), "new");
    }

    #[test]
    fn test_object_property() {
        reset_document();

        let el = create_element("todo-item");
        set_property(el, "todo", Value::object(Rc::new(42u32)));
        assert_eq!(property_as::<u32>(el, "todo").as_deref(), Some(&42));
    }

    #[test]
    fn test_stale_write_is_ignored() {
        reset_document();

        let el = create_element("div");
        crate::engine::release(el).unwrap();
        set_attribute(el, "id", "gone");
        assert_eq!(attribute(el, "id"), None);
    }
}
