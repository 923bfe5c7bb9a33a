use ego_tree::iter::Edge;
use scraper::node::Node;
use scraper::ElementRef;

use crate::dom;

/// The only attributes a snapshot keeps.
const SNAPSHOT_ATTRIBUTES: [&str; 4] = ["name", "type", "pattern", "value"];

const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Serialize a form into a compact, attribute-filtered HTML string.
///
/// Tags are kept, attributes are reduced to `name`, `type`, `pattern` and
/// `value` (and dropped entirely on disabled or read-only controls), and text
/// is trimmed and inlined. Template and shadow tree content is left out.
/// Walks the tree iteratively.
pub fn snapshot_form(form: ElementRef<'_>) -> String {
    let mut out = String::new();
    for edge in dom::scoped_edges(form) {
        match edge {
            Edge::Open(node) => match node.value() {
                Node::Element(element) => {
                    out.push('<');
                    out.push_str(element.name());
                    let frozen =
                        element.attr("disabled").is_some() || element.attr("readonly").is_some();
                    if !frozen {
                        for name in SNAPSHOT_ATTRIBUTES {
                            if let Some(value) = element.attr(name) {
                                out.push(' ');
                                out.push_str(name);
                                out.push_str("=\"");
                                push_escaped(&mut out, value, true);
                                out.push('"');
                            }
                        }
                    }
                    out.push('>');
                }
                Node::Text(text) => {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        push_escaped(&mut out, trimmed, false);
                    }
                }
                _ => {}
            },
            Edge::Close(node) => {
                if let Node::Element(element) = node.value() {
                    if !VOID_ELEMENTS.contains(&element.name()) {
                        out.push_str("</");
                        out.push_str(element.name());
                        out.push('>');
                    }
                }
            }
        }
    }
    out
}

fn push_escaped(out: &mut String, raw: &str, in_attribute: bool) {
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}
