use formfill_core::FieldDefinition;
use serde::Serialize;

pub const SYSTEM_INSTRUCTION: &str = "You fill in web forms with plausible, realistic sample data. \
You receive a description of a form. Reply with a single flat JSON object whose keys are the \
field names and whose values are strings. For picklist fields choose from the listed values; \
when isMultiSelect is true answer with an array of chosen values. Text values must satisfy the \
field's pattern when one is given. Do not add commentary.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Transport-neutral completion request; the client adds model and streaming options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
}

/// What the completion service is shown about the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPayload {
    Definitions(Vec<FieldDefinition>),
    Snapshot(String),
}

pub fn build_request(
    payload: &FormPayload,
    custom_instruction: Option<&str>,
) -> Result<CompletionRequest, serde_json::Error> {
    let mut messages = vec![ChatMessage::new(Role::System, SYSTEM_INSTRUCTION)];
    if let Some(extra) = custom_instruction.map(str::trim).filter(|text| !text.is_empty()) {
        messages.push(ChatMessage::new(Role::System, extra));
    }

    let user = match payload {
        FormPayload::Definitions(definitions) => {
            format!("```json\n{}\n```", serde_json::to_string(definitions)?)
        }
        FormPayload::Snapshot(html) => format!("```html\n{html}\n```"),
    };
    messages.push(ChatMessage::new(Role::User, user));
    Ok(CompletionRequest { messages })
}

#[cfg(test)]
mod tests {
    use formfill_core::{FieldDefinition, TextFieldDefinition};

    use super::{build_request, FormPayload, Role, SYSTEM_INSTRUCTION};

    #[test]
    fn definitions_are_fenced_as_json() {
        let payload = FormPayload::Definitions(vec![FieldDefinition::Text(TextFieldDefinition {
            name: "email".into(),
            label: "Email".into(),
            type_hint: Some("email".into()),
            pattern: None,
        })]);
        let request = build_request(&payload, None).unwrap();

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].content, SYSTEM_INSTRUCTION);
        assert_eq!(request.messages[1].role, Role::User);
        assert_eq!(
            request.messages[1].content,
            "```json\n[{\"kind\":\"text\",\"name\":\"email\",\"label\":\"Email\",\"type\":\"email\"}]\n```"
        );
    }

    #[test]
    fn custom_instruction_is_a_second_system_message() {
        let payload = FormPayload::Snapshot("<form></form>".into());
        let request = build_request(&payload, Some("  Use German names. ")).unwrap();

        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[1].role, Role::System);
        assert_eq!(request.messages[1].content, "Use German names.");
        assert_eq!(request.messages[2].content, "```html\n<form></form>\n```");
    }

    #[test]
    fn blank_custom_instruction_is_ignored() {
        let payload = FormPayload::Snapshot(String::new());
        let request = build_request(&payload, Some("   ")).unwrap();
        assert_eq!(request.messages.len(), 2);
    }
}
