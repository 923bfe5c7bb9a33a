use std::collections::HashMap;

use ego_tree::NodeId;
use scraper::ElementRef;
use serde::Serialize;

use crate::{dom, extract};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Text,
    TextArea,
    Select,
    Checkbox,
    Radio,
}

impl ControlKind {
    pub fn is_toggle(self) -> bool {
        matches!(self, ControlKind::Checkbox | ControlKind::Radio)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

/// Owned state of one control in a live form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormControl {
    pub name: String,
    pub id: Option<String>,
    pub kind: ControlKind,
    /// `type` attribute of inputs, lowercased.
    pub input_type: Option<String>,
    pub label: Option<String>,
    /// Current value; the submitted `value` attribute for toggles.
    pub value: String,
    pub checked: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    /// Index of the enclosing field group, if any.
    pub group: Option<usize>,
}

/// A `<fieldset>` addressed as one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldGroup {
    pub name: String,
    pub members: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlEventKind {
    Input,
    Change,
}

/// Notification dispatched after a control changed, as a user edit would.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlEvent {
    pub control: usize,
    pub name: String,
    pub kind: ControlEventKind,
}

/// Mutable model of a form's editable controls.
///
/// Captured from the parsed page once per job; population writes into it and
/// hosts read it back (or mirror its events into a real document).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LiveForm {
    controls: Vec<FormControl>,
    groups: Vec<FieldGroup>,
    #[serde(skip)]
    events: Vec<ControlEvent>,
}

impl LiveForm {
    /// Capture the enabled, writable controls of `form`.
    pub fn from_element(form: ElementRef<'_>) -> Self {
        let mut live = LiveForm::default();
        let mut group_of: HashMap<NodeId, usize> = HashMap::new();

        for element in dom::descendant_elements(form) {
            if dom::tag(element) == "fieldset" {
                if let Some(name) = extract::group_name(element) {
                    group_of.insert(element.id(), live.groups.len());
                    live.groups.push(FieldGroup {
                        name,
                        members: Vec::new(),
                    });
                }
                continue;
            }

            let Some(mut control) = capture_control(element, form) else {
                continue;
            };
            control.group = dom::enclosing(element, form, "fieldset")
                .and_then(|fieldset| group_of.get(&fieldset.id()).copied());
            let index = live.controls.len();
            if let Some(group) = control.group {
                live.groups[group].members.push(index);
            }
            live.controls.push(control);
        }
        live
    }

    pub fn controls(&self) -> &[FormControl] {
        &self.controls
    }

    pub fn groups(&self) -> &[FieldGroup] {
        &self.groups
    }

    /// Events dispatched so far, oldest first.
    pub fn events(&self) -> &[ControlEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<ControlEvent> {
        std::mem::take(&mut self.events)
    }

    /// Current value of the first control outside any group named `name`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.controls
            .iter()
            .find(|control| control.group.is_none() && control.name == name)
            .map(|control| control.value.as_str())
    }

    /// Labels (or values, when unlabeled) of the checked toggles addressed by `name`.
    pub fn checked(&self, name: &str) -> Vec<&str> {
        let grouped = self.group_index(name).map(|group| self.groups[group].members.clone());
        let members = grouped.unwrap_or_else(|| self.top_level_named(name));
        members
            .into_iter()
            .map(|index| &self.controls[index])
            .filter(|control| control.checked)
            .map(|control| control.label.as_deref().unwrap_or(&control.value))
            .collect()
    }

    pub(crate) fn group_index(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|group| group.name == name)
    }

    pub(crate) fn group_members(&self, group: usize) -> Vec<usize> {
        self.groups[group].members.clone()
    }

    /// Indices of controls named `name` that are not inside a field group.
    pub(crate) fn top_level_named(&self, name: &str) -> Vec<usize> {
        self.controls
            .iter()
            .enumerate()
            .filter(|(_, control)| control.group.is_none() && control.name == name)
            .map(|(index, _)| index)
            .collect()
    }

    pub(crate) fn control(&self, index: usize) -> &FormControl {
        &self.controls[index]
    }

    pub(crate) fn set_value(&mut self, index: usize, value: &str) {
        let control = &mut self.controls[index];
        control.value = value.to_string();
        self.dispatch(index);
    }

    /// Check or uncheck a toggle. Checking a radio unchecks its same-named peers.
    pub(crate) fn set_checked(&mut self, index: usize, checked: bool) {
        if checked && self.controls[index].kind == ControlKind::Radio {
            let name = self.controls[index].name.clone();
            for (other, control) in self.controls.iter_mut().enumerate() {
                if other != index && control.kind == ControlKind::Radio && control.name == name {
                    control.checked = false;
                }
            }
        }
        self.controls[index].checked = checked;
        self.dispatch(index);
    }

    fn dispatch(&mut self, index: usize) {
        let name = self.controls[index].name.clone();
        for kind in [ControlEventKind::Input, ControlEventKind::Change] {
            self.events.push(ControlEvent {
                control: index,
                name: name.clone(),
                kind,
            });
        }
    }
}

fn capture_control(element: ElementRef<'_>, form: ElementRef<'_>) -> Option<FormControl> {
    let name = dom::attr(element, "name").filter(|name| !name.is_empty())?;
    if dom::is_disabled_or_readonly(element) {
        return None;
    }

    let mut input_type = None;
    let mut options = Vec::new();
    let (kind, value) = match dom::tag(element) {
        "input" => {
            let ty = dom::input_type(element);
            let kind = match ty.as_str() {
                "checkbox" => ControlKind::Checkbox,
                "radio" => ControlKind::Radio,
                _ => ControlKind::Text,
            };
            let default_value = if kind.is_toggle() { "on" } else { "" };
            let value = dom::attr(element, "value").unwrap_or(default_value).to_string();
            input_type = Some(ty);
            (kind, value)
        }
        "textarea" => (ControlKind::TextArea, element.text().collect::<String>()),
        "select" => {
            let mut selected = None;
            for option in
                dom::descendant_elements(element).filter(|option| dom::tag(*option) == "option")
            {
                let text = dom::element_text(option);
                let value = dom::attr(option, "value").map_or_else(|| text.clone(), str::to_string);
                if selected.is_none() && dom::attr(option, "selected").is_some() {
                    selected = Some(value.clone());
                }
                options.push(SelectOption { value, text });
            }
            let value = selected
                .or_else(|| options.first().map(|option| option.value.clone()))
                .unwrap_or_default();
            (ControlKind::Select, value)
        }
        _ => return None,
    };

    Some(FormControl {
        name: name.to_string(),
        id: element.value().id().map(ToOwned::to_owned),
        kind,
        input_type,
        label: dom::label_text(element, form),
        value,
        checked: kind.is_toggle() && dom::attr(element, "checked").is_some(),
        options,
        group: None,
    })
}
