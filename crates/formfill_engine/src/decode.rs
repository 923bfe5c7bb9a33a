//! Tolerant decoding of a streamed, flat JSON object.
//!
//! The completion service writes one JSON object a few characters at a time.
//! [`StreamDecoder`] repairs whatever has arrived since the last boundary into
//! a closed object and, once that parses, hands the completed fields out and
//! forgets the consumed text. Work per push is bounded by the size of the
//! next increment, not by the length of the whole response.

use std::borrow::Cow;
use std::collections::HashSet;

use formfill_core::{FieldValue, FieldValues};
use formfill_logging::{fill_debug, fill_trace};
use serde_json::{Map, Value};

const FENCE: &str = "```";
const OPENING_BRACE: char = '{';

#[derive(Debug, Clone)]
pub struct StreamDecoder {
    buffer: String,
    emitted: HashSet<String>,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            emitted: HashSet::new(),
        }
    }

    /// Feed one fragment; returns fields completed by it, if any.
    ///
    /// Unparseable intermediate states are the normal case and yield `None`.
    pub fn push(&mut self, fragment: &str) -> Option<FieldValues> {
        self.buffer.push_str(fragment);
        let candidate = repair(&self.buffer)?;
        let object: Map<String, Value> = match serde_json::from_str(&candidate) {
            Ok(object) => object,
            Err(err) => {
                fill_trace!("decoder holding {} bytes: {}", self.buffer.len(), err);
                return None;
            }
        };
        if object.is_empty() {
            return None;
        }

        self.buffer.clear();
        self.buffer.push(OPENING_BRACE);

        let mut values = FieldValues::new();
        for (name, value) in object {
            if self.emitted.contains(&name) {
                fill_debug!("decoder dropping repeated field `{}`", name);
                continue;
            }
            match field_value(value) {
                Some(value) => {
                    self.emitted.insert(name.clone());
                    values.insert(name, value);
                }
                None => fill_debug!("decoder dropping non-scalar field `{}`", name),
            }
        }
        (!values.is_empty()).then_some(values)
    }

    /// Drop buffered text before a new attempt. Fields already emitted stay
    /// emitted, so a restarted stream does not apply them twice.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Text received since the last boundary.
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

/// Close the buffered text into a candidate object, or `None` when its last
/// value cannot be complete yet.
fn repair(raw: &str) -> Option<String> {
    let body = strip_fences(raw)?;
    // A bare number or literal at the end may still be growing.
    if !body.ends_with(|c| matches!(c, ',' | '}' | '"' | ']')) {
        return None;
    }
    let body = strip_suffix_once(body, ',');
    let body = strip_suffix_once(body, '}');
    let body = strip_suffix_once(body, ',');
    let body = drop_leading_separator(body);
    Some(format!("{body}}}"))
}

/// Remove an opening fence (with its language tag) and any closing fence or
/// partial closing fence. `None` while the opening fence line is incomplete.
fn strip_fences(raw: &str) -> Option<&str> {
    let mut body = raw.trim_start();
    if let Some(rest) = body.strip_prefix(FENCE) {
        let newline = rest.find('\n')?;
        body = &rest[newline + 1..];
    }
    Some(body.trim_end().trim_end_matches('`').trim())
}

fn strip_suffix_once(body: &str, suffix: char) -> &str {
    body.strip_suffix(suffix).unwrap_or(body).trim_end()
}

/// After a boundary the buffer restarts as `{`, so the separator that
/// followed the consumed field shows up right after the brace.
fn drop_leading_separator(body: &str) -> Cow<'_, str> {
    if let Some(rest) = body.strip_prefix(OPENING_BRACE) {
        if let Some(after) = rest.trim_start().strip_prefix(',') {
            return Cow::Owned(format!("{OPENING_BRACE}{after}"));
        }
    }
    Cow::Borrowed(body)
}

fn field_value(value: Value) -> Option<FieldValue> {
    match value {
        Value::Array(items) => Some(FieldValue::Multiple(
            items.into_iter().filter_map(scalar_text).collect(),
        )),
        other => scalar_text(other).map(FieldValue::Single),
    }
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
