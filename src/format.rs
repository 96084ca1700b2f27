//! Rendering of values for failure messages, and the line differ that
//! points at the first place two renderings disagree.

use std::collections::HashSet;

use serde::Serialize;

use crate::errors::HarnessError;
use crate::value::Value;

// ============================================================================
// VALUE FORMATTER
// ============================================================================

/// Renders `value` for a diagnostic, prefixed by `prefix`.
///
/// Falsy values render as an empty string, prefix included. Strings are
/// printed as they are; anything else is pretty-printed as JSON with a
/// second visit of the same container printed as `null`. Multi-line output
/// starts on the line after the prefix.
///
/// ```rust
/// use sequitur::{format_value, Value};
/// assert_eq!(format_value(&Value::from(123), ""), "123");
/// assert_eq!(format_value(&Value::from("value"), "label:"), "label:value");
/// assert_eq!(format_value(&Value::from(0), "label:"), "");
/// ```
pub fn format_value(value: &Value, prefix: &str) -> String {
    if !value.is_truthy() {
        return String::new();
    }
    let text = match value {
        Value::String(s) => s.clone(),
        other => format!("{:#}", to_json(other)),
    };
    if text.contains('\n') {
        format!("{prefix}\n{text}")
    } else {
        format!("{prefix}{text}")
    }
}

/// Converts a value to JSON for printing. Containers seen before become
/// `null`, which also breaks cycles.
pub(crate) fn to_json(value: &Value) -> serde_json::Value {
    let mut seen = HashSet::new();
    json_of(value, &mut seen)
}

fn json_of(value: &Value, seen: &mut HashSet<usize>) -> serde_json::Value {
    if let Some(addr) = value.container_addr() {
        if !seen.insert(addr) {
            return serde_json::Value::Null;
        }
    }
    match value {
        Value::Undefined | Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => json_number(*n),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => serde_json::Value::Array(
            items.items().iter().map(|item| json_of(item, seen)).collect(),
        ),
        Value::Object(entries) => {
            let mut map = serde_json::Map::new();
            for (key, item) in entries.entries().iter() {
                // Undefined members are dropped, as the JSON encoder does.
                if matches!(item, Value::Undefined) {
                    continue;
                }
                map.insert(key.clone(), json_of(item, seen));
            }
            serde_json::Value::Object(map)
        }
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn json_number(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

// ============================================================================
// TEXT DIFFER
// ============================================================================

/// The first pair of lines at which two texts disagree. A side that ran out
/// of lines is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineDivergence {
    pub expected_line: Option<String>,
    pub given_line: Option<String>,
}

/// Scans `given` and `expected` line by line and returns the first index at
/// which they differ, or `None` when the texts are identical.
///
/// ```rust
/// use sequitur::first_divergent_line;
/// let d = first_divergent_line("a\nb", "a\nc").unwrap();
/// assert_eq!(d.expected_line.as_deref(), Some("c"));
/// assert_eq!(d.given_line.as_deref(), Some("b"));
/// assert!(first_divergent_line("same", "same").is_none());
/// ```
pub fn first_divergent_line(given: &str, expected: &str) -> Option<LineDivergence> {
    if given == expected {
        return None;
    }
    let given_lines: Vec<&str> = given.split('\n').collect();
    let expected_lines: Vec<&str> = expected.split('\n').collect();
    let len = given_lines.len().max(expected_lines.len());

    (0..len).find_map(|i| {
        let given_line = given_lines.get(i).copied();
        let expected_line = expected_lines.get(i).copied();
        (given_line != expected_line).then(|| LineDivergence {
            expected_line: expected_line.map(str::to_string),
            given_line: given_line.map(str::to_string),
        })
    })
}

/// Dynamic variant of [`first_divergent_line`]; both values must be strings.
pub fn first_divergent_line_of(
    given: &Value,
    expected: &Value,
) -> Result<Option<LineDivergence>, HarnessError> {
    let given = require_string(given)?;
    let expected = require_string(expected)?;
    Ok(first_divergent_line(given, expected))
}

fn require_string(value: &Value) -> Result<&str, HarnessError> {
    value.as_str().ok_or_else(|| HarnessError::TypeMismatch {
        actual: value.type_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Object;

    fn trim(text: &str) -> String {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn strings_render_raw() {
        assert_eq!(format_value(&Value::from("test string"), ""), "test string");
    }

    #[test]
    fn numbers_render_without_fraction() {
        assert_eq!(format_value(&Value::from(123), ""), "123");
        assert_eq!(format_value(&Value::from(1.5), ""), "1.5");
        assert_eq!(format_value(&Value::from(-4), ""), "-4");
    }

    #[test]
    fn falsy_values_render_empty() {
        for v in [
            Value::Undefined,
            Value::Null,
            Value::from(false),
            Value::from(0),
            Value::from(""),
        ] {
            assert_eq!(format_value(&v, "prefix:"), "");
        }
    }

    #[test]
    fn true_renders_as_json_literal() {
        assert_eq!(format_value(&Value::from(true), ">>> "), ">>> true");
    }

    #[test]
    fn arrays_pretty_print_with_two_spaces() {
        let v = Value::array(vec![
            1.into(),
            "a".into(),
            Value::object([("x", 2.into())]),
        ]);
        let rendered = format_value(&v, "");
        assert!(rendered.starts_with("\n[\n  1,\n  \"a\",\n  {\n    \"x\": 2\n  }\n]"));
    }

    #[test]
    fn multiline_output_moves_below_prefix() {
        let v = Value::object([("a", "test".into())]);
        assert_eq!(format_value(&v, "label:"), "label:\n{\n  \"a\": \"test\"\n}");
    }

    #[test]
    fn empty_containers_stay_inline() {
        assert_eq!(format_value(&Value::array(vec![]), "x="), "x=[]");
    }

    #[test]
    fn repeated_containers_print_as_null() {
        let first = Object::new();
        let second = Object::new();
        first.insert("order", 1);
        first.insert("prev", Value::Null);
        first.insert("next", second.clone());
        second.insert("order", 2);
        second.insert("prev", first.clone());
        second.insert("next", Value::Null);

        let expected = r#"{
            "order": 1,
            "prev": null,
            "next": {
                "order": 2,
                "prev": null,
                "next": null
            }
        }"#;
        assert_eq!(trim(&format_value(&Value::Object(first), "")), trim(expected));
    }

    #[test]
    fn undefined_members_follow_json_rules() {
        let v = Value::object([
            ("kept", Value::array(vec![Value::Undefined])),
            ("dropped", Value::Undefined),
        ]);
        assert_eq!(to_json(&v).to_string(), r#"{"kept":[null]}"#);
    }

    #[test]
    fn identical_texts_have_no_divergence() {
        for s in ["", "one", "a\nb\nc"] {
            assert_eq!(first_divergent_line(s, s), None);
        }
    }

    #[test]
    fn finds_first_differing_line() {
        let expected = "[\n\t{\"valid-prop\": true},\n\t{\"invalid-prop\": false},\n\t{\"valid-prop\": true},\n]";
        let given = "[\n\t{\"valid-prop\": true},\n\t{\"invalid-prop\": true},\n\t{\"valid-prop\": true},\n]";
        assert_eq!(
            first_divergent_line(given, expected),
            Some(LineDivergence {
                expected_line: Some("\t{\"invalid-prop\": false},".to_string()),
                given_line: Some("\t{\"invalid-prop\": true},".to_string()),
            })
        );
    }

    #[test]
    fn shorter_side_reports_missing_line() {
        let d = first_divergent_line("a", "a\nb").unwrap();
        assert_eq!(d.expected_line.as_deref(), Some("b"));
        assert_eq!(d.given_line, None);

        let d = first_divergent_line("a\nb", "a").unwrap();
        assert_eq!(d.expected_line, None);
        assert_eq!(d.given_line.as_deref(), Some("b"));
    }

    #[test]
    fn non_string_input_is_a_type_mismatch() {
        let err = first_divergent_line_of(&Value::from(1), &Value::from("x")).unwrap_err();
        assert!(matches!(err, HarnessError::TypeMismatch { ref actual } if actual == "number"));
        assert!(first_divergent_line_of(&Value::from("x"), &Value::Null).is_err());
        assert_eq!(
            first_divergent_line_of(&Value::from("x"), &Value::from("x")).unwrap(),
            None
        );
    }
}
