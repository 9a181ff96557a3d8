//! HTML serialization of the arena, for debugging and structural comparison.

use super::registry::{with_document, Document};
use crate::types::{NodeId, NodeKind};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Serialize `id` and its subtree.
///
/// Fragments and the document serialize as their children. Markers appear as
/// ordinary comments.
pub fn outer_html(id: NodeId) -> String {
    with_document(|doc| {
        let mut out = String::new();
        write_node(doc, id, &mut out);
        out
    })
}

/// Serialize the children of `id`.
pub fn inner_html(id: NodeId) -> String {
    with_document(|doc| {
        let mut out = String::new();
        for child in doc.children(id) {
            write_node(doc, child, &mut out);
        }
        out
    })
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    let Some(node) = doc.get(id) else { return };
    match &node.kind {
        NodeKind::Text(data) => out.push_str(&escape(data, false)),
        NodeKind::Comment(data) => {
            out.push_str("<!--");
            out.push_str(data);
            out.push_str("-->");
        }
        NodeKind::Document | NodeKind::Fragment => {
            for child in doc.children(id) {
                write_node(doc, child, out);
            }
        }
        NodeKind::Element { tag, is } => {
            out.push('<');
            out.push_str(tag);
            if let Some(is) = is {
                push_attr(out, "is", is);
            }
            for (name, value) in &node.attributes {
                if name == "style" && !node.style.is_empty() {
                    continue;
                }
                push_attr(out, name, value);
            }
            if !node.style.is_empty() {
                let css = node
                    .style
                    .iter()
                    .map(|(k, v)| format!("{k}: {v};"))
                    .collect::<Vec<_>>()
                    .join(" ");
                push_attr(out, "style", &css);
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            for child in doc.children(id) {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape(value, true));
    out.push('"');
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{
        append_child, create_element, create_element_is, create_fragment, create_marker,
        create_text_node, reset_document, set_attribute, set_style,
    };

    #[test]
    fn test_serialize_element_tree() {
        reset_document();

        let li = create_element("li");
        set_attribute(li, "class", "completed");
        let input = create_element("input");
        set_attribute(input, "type", "checkbox");
        append_child(li, input).unwrap();
        append_child(li, create_text_node("a < b & \"c\"")).unwrap();

        assert_eq!(
            outer_html(li),
            "<li class=\"completed\"><input type=\"checkbox\">a &lt; b &amp; \"c\"</li>"
        );
    }

    #[test]
    fn test_serialize_fragment_with_markers() {
        reset_document();

        let fragment = create_fragment();
        append_child(fragment, create_marker("|")).unwrap();
        append_child(fragment, create_text_node("x")).unwrap();
        append_child(fragment, create_marker("#")).unwrap();

        assert_eq!(outer_html(fragment), "<!--|-->x<!--#-->");
        assert_eq!(inner_html(fragment), outer_html(fragment));
    }

    #[test]
    fn test_serialize_style_and_is() {
        reset_document();

        let li = create_element_is("li", Some("fancy-li"));
        set_style(li, "display", "none");
        assert_eq!(outer_html(li), "<li is=\"fancy-li\" style=\"display: none;\"></li>");
    }
}
