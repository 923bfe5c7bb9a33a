use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Host-assigned identifier of the browser tab (or page) holding the form.
pub type TabId = u32;

/// Structured description of one form field, sent to the completion service.
///
/// Serialized with an explicit `kind` discriminant so the remote side never
/// has to guess the shape from which properties happen to be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FieldDefinition {
    Text(TextFieldDefinition),
    Picklist(PicklistFieldDefinition),
}

impl FieldDefinition {
    pub fn name(&self) -> &str {
        match self {
            FieldDefinition::Text(text) => &text.name,
            FieldDefinition::Picklist(picklist) => &picklist.name,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            FieldDefinition::Text(text) => &text.label,
            FieldDefinition::Picklist(picklist) => &picklist.label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFieldDefinition {
    pub name: String,
    pub label: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PicklistFieldDefinition {
    pub name: String,
    pub label: String,
    pub is_multi_select: bool,
    pub values: Vec<String>,
}

/// Value produced for one field: a single string, or an ordered list for
/// multi-select groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(String),
    Multiple(Vec<String>),
}

impl FieldValue {
    /// The scalar form of this value; `None` for lists.
    pub fn as_single(&self) -> Option<&str> {
        match self {
            FieldValue::Single(value) => Some(value),
            FieldValue::Multiple(_) => None,
        }
    }

    /// Every candidate this value names, a scalar being a list of one.
    pub fn candidates(&self) -> Vec<&str> {
        match self {
            FieldValue::Single(value) => vec![value.as_str()],
            FieldValue::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Single(value.to_string())
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(values: Vec<&str>) -> Self {
        FieldValue::Multiple(values.into_iter().map(ToOwned::to_owned).collect())
    }
}

/// Field name to value. Keys are unique per form snapshot.
pub type FieldValues = BTreeMap<String, FieldValue>;

/// Inbound request from the host to start a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub tab_id: Option<TabId>,
    pub selector: String,
}

impl StartRequest {
    pub fn new(tab_id: TabId, selector: impl Into<String>) -> Self {
        Self {
            tab_id: Some(tab_id),
            selector: selector.into(),
        }
    }
}

/// A start request whose tab has been resolved by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTarget {
    pub tab_id: TabId,
    pub selector: String,
}
