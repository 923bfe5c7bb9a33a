use std::collections::HashSet;

use formfill_core::{FieldDefinition, PicklistFieldDefinition, TextFieldDefinition};
use formfill_logging::fill_debug;
use scraper::ElementRef;

use crate::dom;

/// Build the field model of a form.
///
/// Candidates are the top-level named controls (not disabled, not read-only,
/// not inside a `<fieldset>`) plus every `<fieldset>`, each group becoming one
/// picklist. Definitions without a label carry nothing the completion service
/// can describe and are dropped, as are repeated names.
pub fn extract_field_definitions(form: ElementRef<'_>) -> Vec<FieldDefinition> {
    let mut seen = HashSet::new();
    top_level_field_elements(form)
        .filter_map(|element| {
            if dom::tag(element) == "fieldset" {
                group_definition(element, form)
            } else {
                control_definition(element, form)
            }
        })
        .filter(|definition| {
            if definition.label().trim().is_empty() {
                fill_debug!("skipping unlabeled field `{}`", definition.name());
                return false;
            }
            seen.insert(definition.name().to_string())
        })
        .collect()
}

/// Field groups and the named controls outside them, in document order.
pub(crate) fn top_level_field_elements<'a>(
    form: ElementRef<'a>,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    dom::descendant_elements(form).filter(move |element| {
        if dom::tag(*element) == "fieldset" {
            return true;
        }
        dom::attr(*element, "name").is_some_and(|name| !name.is_empty())
            && !dom::is_disabled_or_readonly(*element)
            && !dom::in_field_group(*element, form)
    })
}

/// Named inputs of a field group, in document order.
pub(crate) fn group_members<'a>(group: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    dom::descendant_elements(group)
        .filter(|element| {
            dom::tag(*element) == "input"
                && dom::attr(*element, "name").is_some_and(|name| !name.is_empty())
        })
        .collect()
}

/// Key of a field group: its own `name`, else its first member's.
pub(crate) fn group_name(group: ElementRef<'_>) -> Option<String> {
    dom::attr(group, "name")
        .filter(|name| !name.is_empty())
        .or_else(|| {
            group_members(group)
                .first()
                .and_then(|member| dom::attr(*member, "name"))
        })
        .map(ToOwned::to_owned)
}

fn group_definition(group: ElementRef<'_>, form: ElementRef<'_>) -> Option<FieldDefinition> {
    let name = group_name(group)?;
    let members = group_members(group);
    let label = dom::descendant_elements(group)
        .find(|element| dom::tag(*element) == "legend")
        .map(dom::element_text)
        .unwrap_or_default();
    // A lone checkbox is a boolean, not a picklist.
    let is_multi_select = members
        .first()
        .is_some_and(|first| dom::input_type(*first) == "checkbox")
        && members.len() > 1;
    let values = members
        .iter()
        .filter_map(|member| dom::label_text(*member, form))
        .collect();

    Some(FieldDefinition::Picklist(PicklistFieldDefinition {
        name,
        label,
        is_multi_select,
        values,
    }))
}

fn control_definition(control: ElementRef<'_>, form: ElementRef<'_>) -> Option<FieldDefinition> {
    let name = dom::attr(control, "name")?.to_string();
    let label = dom::label_text(control, form).unwrap_or_default();

    let definition = match dom::tag(control) {
        "select" => FieldDefinition::Picklist(PicklistFieldDefinition {
            name,
            label,
            is_multi_select: false,
            values: dom::descendant_elements(control)
                .filter(|element| dom::tag(*element) == "option")
                .map(dom::element_text)
                .filter(|text| !text.is_empty())
                .collect(),
        }),
        tag => FieldDefinition::Text(TextFieldDefinition {
            name,
            label,
            type_hint: match tag {
                "input" => Some(dom::input_type(control)),
                "textarea" => Some("textarea".to_string()),
                _ => None,
            },
            pattern: dom::attr(control, "pattern")
                .filter(|pattern| !pattern.is_empty())
                .map(ToOwned::to_owned),
        }),
    };
    Some(definition)
}
