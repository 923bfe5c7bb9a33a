use std::collections::HashSet;

use formfill_core::{FieldValue, FieldValues};
use formfill_engine::StreamDecoder;
use pretty_assertions::assert_eq;

const RESPONSE: &str = "```json\n{\n  \"email\": \"a@b.com\",\n  \"name\": \"John, \\\"Jo\\\" Doe\",\n  \"note\": \"curly } and , inside\",\n  \"contact\": [\"Mail\", \"Phone\"],\n  \"age\": 42,\n  \"agree\": true\n}\n```";

fn full_parse() -> FieldValues {
    let mut expected = FieldValues::new();
    expected.insert("email".into(), "a@b.com".into());
    expected.insert("name".into(), "John, \"Jo\" Doe".into());
    expected.insert("note".into(), "curly } and , inside".into());
    expected.insert("contact".into(), vec!["Mail", "Phone"].into());
    expected.insert("age".into(), "42".into());
    expected.insert("agree".into(), "true".into());
    expected
}

/// Feed `fragments` and merge everything emitted, failing on a repeated key.
fn decode_all<'a>(fragments: impl IntoIterator<Item = &'a str>) -> FieldValues {
    let mut decoder = StreamDecoder::new();
    let mut merged = FieldValues::new();
    let mut seen = HashSet::new();
    for fragment in fragments {
        if let Some(values) = decoder.push(fragment) {
            assert!(!values.is_empty());
            for (name, value) in values {
                assert!(seen.insert(name.clone()), "`{name}` emitted twice");
                merged.insert(name, value);
            }
        }
    }
    merged
}

fn char_boundaries(text: &str) -> Vec<usize> {
    (0..=text.len())
        .filter(|index| text.is_char_boundary(*index))
        .collect()
}

#[test]
fn email_then_partial_name_then_rest() {
    let mut decoder = StreamDecoder::new();

    let first = decoder.push("{\"email\":\"a@b.com\",");
    let second = decoder.push("\"name\":\"Jo");
    let third = decoder.push("hn\"}");

    let mut expected_first = FieldValues::new();
    expected_first.insert("email".into(), FieldValue::from("a@b.com"));
    let mut expected_third = FieldValues::new();
    expected_third.insert("name".into(), FieldValue::from("John"));
    assert_eq!(first, Some(expected_first));
    assert_eq!(second, None);
    assert_eq!(third, Some(expected_third));
}

#[test]
fn any_single_split_reproduces_the_full_parse() {
    for split in char_boundaries(RESPONSE) {
        let (head, tail) = RESPONSE.split_at(split);
        assert_eq!(decode_all([head, tail]), full_parse(), "split at {split}");
    }
}

#[test]
fn character_by_character_reproduces_the_full_parse() {
    let pieces: Vec<String> = RESPONSE.chars().map(String::from).collect();
    assert_eq!(decode_all(pieces.iter().map(String::as_str)), full_parse());
}

#[test]
fn any_two_splits_reproduce_the_full_parse() {
    let text = "{\"a\":\"x,y\",\"b\":[\"1\",\"2\"],\"c\":7}";
    let mut expected = FieldValues::new();
    expected.insert("a".into(), "x,y".into());
    expected.insert("b".into(), vec!["1", "2"].into());
    expected.insert("c".into(), "7".into());

    let boundaries = char_boundaries(text);
    for (index, first) in boundaries.iter().enumerate() {
        for second in &boundaries[index..] {
            let fragments = [&text[..*first], &text[*first..*second], &text[*second..]];
            assert_eq!(decode_all(fragments), expected, "splits at {first}/{second}");
        }
    }
}

#[test]
fn repeated_key_from_upstream_is_not_emitted_again() {
    let emitted = decode_all(["{\"a\":\"1\",", "\"a\":\"2\",", "\"b\":\"3\"}"]);

    let mut expected = FieldValues::new();
    expected.insert("a".into(), "1".into());
    expected.insert("b".into(), "3".into());
    assert_eq!(emitted, expected);
}

#[test]
fn reset_keeps_emitted_keys() {
    let mut decoder = StreamDecoder::new();
    assert!(decoder.push("{\"a\":\"1\",").is_some());
    assert!(decoder.push("\"b\":\"par").is_none());
    decoder.reset();
    assert_eq!(decoder.pending(), "");

    let retry = decoder.push("{\"a\":\"1\",\"b\":\"2\"}").unwrap();
    assert_eq!(retry.keys().map(String::as_str).collect::<Vec<_>>(), vec!["b"]);
}

#[test]
fn malformed_input_never_panics() {
    let garbage = [
        "",
        "}",
        "}}}}",
        ",,,",
        "```",
        "```json",
        "```json\n```",
        "[1,2,3]",
        "\"just a string\"",
        "{\"a\":",
        "{\"a\":{\"b\":",
        "null",
        "{\"\u{0}\":\"\\u12\"",
        "{\"a\":\"\\",
        "\u{feff}{\"a\":\"b\"}",
        "{]}",
    ];
    for start in 0..garbage.len() {
        let mut decoder = StreamDecoder::new();
        for fragment in garbage[start..].iter().chain(garbage.iter()) {
            if let Some(values) = decoder.push(fragment) {
                assert!(!values.is_empty());
            }
        }
    }
}

#[test]
fn empty_object_is_not_emitted() {
    let mut decoder = StreamDecoder::new();
    assert_eq!(decoder.push("{}"), None);
    assert_eq!(decoder.push("```json\n{ }\n```"), None);
}
