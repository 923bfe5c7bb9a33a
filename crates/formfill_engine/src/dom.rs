//! Small DOM queries shared by the extractor, the snapshot serializer and the live form.

use ego_tree::iter::Edge;
use ego_tree::{NodeId, NodeRef};
use scraper::node::Node;
use scraper::ElementRef;

/// Elements whose text is a control's own content, not part of a label.
const CONTROL_CONTENT_TAGS: [&str; 4] = ["select", "option", "textarea", "button"];

pub(crate) fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn tag(element: ElementRef<'_>) -> &str {
    element.value().name()
}

pub(crate) fn attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name)
}

pub(crate) fn is_disabled_or_readonly(element: ElementRef<'_>) -> bool {
    attr(element, "disabled").is_some() || attr(element, "readonly").is_some()
}

/// Lowercased `type` of an input; `text` when absent, as browsers default it.
pub(crate) fn input_type(element: ElementRef<'_>) -> String {
    attr(element, "type")
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "text".to_string())
}

/// Open and close edges of `root`'s subtree as seen from its own tree.
///
/// Template contents are not part of the tree, and a declarative shadow root
/// template is dropped together with its contents. A shadow tree is only
/// entered through an explicit selector path.
pub(crate) fn scoped_edges<'a>(
    root: ElementRef<'a>,
) -> impl Iterator<Item = Edge<'a, Node>> + 'a {
    let root_id = root.id();
    let mut skipping: Option<NodeId> = None;
    root.traverse().filter(move |edge| {
        let (node, opening) = match *edge {
            Edge::Open(node) => (node, true),
            Edge::Close(node) => (node, false),
        };
        if let Some(template) = skipping {
            if opening || node.id() != template {
                return false;
            }
            skipping = None;
            return !is_shadow_root_template(node);
        }
        let is_template = ElementRef::wrap(node).is_some_and(|element| tag(element) == "template");
        if opening && is_template && node.id() != root_id {
            skipping = Some(node.id());
            return !is_shadow_root_template(node);
        }
        true
    })
}

/// Element descendants of `root`, in document order, excluding `root` itself
/// and anything inside templates or shadow trees.
pub(crate) fn descendant_elements<'a>(
    root: ElementRef<'a>,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let root_id = root.id();
    scoped_edges(root).filter_map(move |edge| match edge {
        Edge::Open(node) if node.id() != root_id => ElementRef::wrap(node),
        _ => None,
    })
}

/// Text nodes of `root` in document order, skipping template and shadow content.
fn scoped_text<'a>(root: ElementRef<'a>) -> impl Iterator<Item = NodeRef<'a, Node>> + 'a {
    scoped_edges(root).filter_map(|edge| match edge {
        Edge::Open(node) if node.value().is_text() => Some(node),
        _ => None,
    })
}

/// Whether `element` sits inside a `<fieldset>` below `form`.
pub(crate) fn in_field_group(element: ElementRef<'_>, form: ElementRef<'_>) -> bool {
    enclosing(element, form, "fieldset").is_some()
}

/// Nearest ancestor of `element` named `name`, not looking past `boundary`.
pub(crate) fn enclosing<'a>(
    element: ElementRef<'a>,
    boundary: ElementRef<'_>,
    name: &str,
) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .take_while(|node| node.id() != boundary.id())
        .filter_map(ElementRef::wrap)
        .find(|ancestor| tag(*ancestor) == name)
}

/// Label text of a control: `label[for=id]` inside the form first, then an
/// enclosing `<label>`. Blank text counts as no label.
pub(crate) fn label_text(control: ElementRef<'_>, form: ElementRef<'_>) -> Option<String> {
    let by_for = control
        .value()
        .id()
        .filter(|id| !id.is_empty())
        .and_then(|id| {
            descendant_elements(form)
                .find(|candidate| tag(*candidate) == "label" && attr(*candidate, "for") == Some(id))
        });
    let label = by_for.or_else(|| enclosing(control, form, "label"))?;
    let text = own_text(label);
    (!text.is_empty()).then_some(text)
}

/// Text of `element` with whitespace collapsed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in scoped_text(element) {
        if let Node::Text(text) = node.value() {
            raw.push_str(text);
        }
    }
    collapse_whitespace(&raw)
}

/// Like [`element_text`] but skipping text owned by nested controls.
fn own_text(label: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in scoped_text(label) {
        if let Node::Text(text) = node.value() {
            if !inside_control_content(node, label) {
                raw.push_str(text);
            }
        }
    }
    collapse_whitespace(&raw)
}

fn inside_control_content(node: NodeRef<'_, Node>, label: ElementRef<'_>) -> bool {
    node.ancestors()
        .take_while(|ancestor| ancestor.id() != label.id())
        .filter_map(ElementRef::wrap)
        .any(|ancestor| CONTROL_CONTENT_TAGS.contains(&tag(ancestor)))
}

/// The declarative shadow root template hosted by `element`, if any.
pub(crate) fn shadow_template(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let first = element.children().find_map(ElementRef::wrap)?;
    is_shadow_root_template(*first).then_some(first)
}

fn is_shadow_root_template(node: NodeRef<'_, Node>) -> bool {
    ElementRef::wrap(node).is_some_and(|element| {
        tag(element) == "template"
            && (attr(element, "shadowrootmode").is_some() || attr(element, "shadowroot").is_some())
    })
}

/// First element of a template's content. The parser keeps template content
/// under a fragment node below the template.
pub(crate) fn template_first_element(template: ElementRef<'_>) -> Option<ElementRef<'_>> {
    template.children().find_map(|child| {
        if child.value().is_fragment() {
            child.children().find_map(ElementRef::wrap)
        } else {
            ElementRef::wrap(child)
        }
    })
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use super::{collapse_whitespace, descendant_elements, element_text, label_text, tag};

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(collapse_whitespace("  Full \n\t name "), "Full name");
    }

    #[test]
    fn wrapping_label_ignores_option_text() {
        let doc = Html::parse_document(
            r#"<form><label>Country <select name="c"><option>US</option></select></label></form>"#,
        );
        let form = doc.select(&Selector::parse("form").unwrap()).next().unwrap();
        let select = doc.select(&Selector::parse("select").unwrap()).next().unwrap();
        assert_eq!(label_text(select, form), Some("Country".to_string()));
    }

    #[test]
    fn template_and_shadow_content_stay_out_of_the_walk() {
        let doc = Html::parse_document(
            r#"<div id="root">
                 <x-card><template shadowrootmode="open"><input name="hidden"></template></x-card>
                 <template><input name="inert"></template>
                 <input name="visible">
               </div>"#,
        );
        let root = doc.select(&Selector::parse("#root").unwrap()).next().unwrap();
        let tags: Vec<&str> = descendant_elements(root).map(tag).collect();
        assert_eq!(tags, vec!["x-card", "template", "input"]);
    }

    #[test]
    fn text_of_a_shadow_host_excludes_its_shadow_tree() {
        let doc = Html::parse_document(
            r#"<legend>Plan <x-tip><template shadowrootmode="open">secret</template></x-tip></legend>"#,
        );
        let legend = doc.select(&Selector::parse("legend").unwrap()).next().unwrap();
        assert_eq!(element_text(legend), "Plan");
    }
}
