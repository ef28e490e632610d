//! Deterministic JSON rendering for structural comparison.
//!
//! Object members are ordered by key using a case-insensitive comparison with
//! an ordinal tie-break, arrays keep their order, and non-integral numbers are
//! rendered in a fixed-precision decimal form with trailing zeros trimmed.
//! Two values are *similar* when their canonical renderings are identical.

use std::cmp::Ordering;

use serde::ser::{Error as _, SerializeMap, SerializeSeq, Serializer};
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::{Number, Value};

/// Maximum number of fractional digits kept when rendering decimals.
pub const MAX_FRACTION_DIGITS: usize = 19;

#[derive(Debug, thiserror::Error)]
pub enum CanonicalError {
    #[error("value could not be converted to JSON: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("invalid JSON text: {0}")]
    Parse(#[source] serde_json::Error),
}

/// Borrowed view of a JSON value that serializes in canonical form.
#[derive(Debug, Clone, Copy)]
pub struct Canonical<'a>(&'a Value);

impl<'a> Canonical<'a> {
    #[must_use]
    pub const fn new(value: &'a Value) -> Self {
        Self(value)
    }
}

impl Serialize for Canonical<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => {
                let mut members: Vec<(&String, &Value)> = map.iter().collect();
                members.sort_by(|(a, _), (b, _)| compare_keys(a, b));

                let mut object = serializer.serialize_map(Some(members.len()))?;
                for (key, value) in members {
                    object.serialize_entry(key, &Canonical(value))?;
                }
                object.end()
            }
            Value::Array(items) => {
                let mut array = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    array.serialize_element(&Canonical(item))?;
                }
                array.end()
            }
            Value::Number(number) => serialize_number(number, serializer),
            scalar => scalar.serialize(serializer),
        }
    }
}

fn serialize_number<S: Serializer>(number: &Number, serializer: S) -> Result<S::Ok, S::Error> {
    match number.as_f64() {
        Some(value) if !(number.is_i64() || number.is_u64()) => {
            RawValue::from_string(format_decimal(value))
                .map_err(S::Error::custom)?
                .serialize(serializer)
        }
        _ => number.serialize(serializer),
    }
}

/// Order keys case-insensitively, breaking ties by ordinal comparison.
///
/// Each char folds to its single-char uppercase form; chars whose uppercase
/// expands to several chars (`ß`) compare as themselves.
#[must_use]
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    a.chars()
        .map(fold_case)
        .cmp(b.chars().map(fold_case))
        .then_with(|| a.cmp(b))
}

fn fold_case(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(single), None) => single,
        _ => c,
    }
}

/// Render a floating point value as trimmed decimal text.
///
/// `30.0` renders as `30`, `1.50` as `1.5`, and values are rounded to
/// [`MAX_FRACTION_DIGITS`] fractional digits. Output never uses exponents.
#[must_use]
pub fn format_decimal(value: f64) -> String {
    let mut text = format!("{value}");
    if let Some((_, fraction)) = text.split_once('.') {
        if fraction.len() > MAX_FRACTION_DIGITS {
            text = format!("{value:.prec$}", prec = MAX_FRACTION_DIGITS);
        }
    }
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text.remove(0);
    }
    text
}

/// Render a JSON value canonically as indented text.
///
/// # Errors
/// Returns an error if a number cannot be rendered as raw JSON.
pub fn render(value: &Value) -> Result<String, CanonicalError> {
    serde_json::to_string_pretty(&Canonical(value)).map_err(CanonicalError::Serialize)
}

/// Serialize any value and render it canonically.
///
/// # Errors
/// Returns an error if the value cannot be represented as JSON (for example a
/// map with non-string keys).
pub fn to_canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CanonicalError> {
    let value = serde_json::to_value(value).map_err(CanonicalError::Serialize)?;
    render(&value)
}

/// Parse JSON text and render it canonically.
///
/// # Errors
/// Returns an error if the text is not valid JSON.
pub fn canonicalize_str(json: &str) -> Result<String, CanonicalError> {
    let value: Value = serde_json::from_str(json).map_err(CanonicalError::Parse)?;
    render(&value)
}

/// Serialize a value as indented JSON, keeping member order as produced.
///
/// # Errors
/// Returns an error if the value cannot be represented as JSON.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CanonicalError> {
    serde_json::to_string_pretty(value).map_err(CanonicalError::Serialize)
}

/// Whether two values have identical canonical renderings.
///
/// # Errors
/// Returns an error if either value cannot be represented as JSON.
pub fn is_similar<A, E>(actual: &A, expected: &E) -> Result<bool, CanonicalError>
where
    A: Serialize + ?Sized,
    E: Serialize + ?Sized,
{
    Ok(to_canonical_json(actual)? == to_canonical_json(expected)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_sorted_case_insensitively() {
        let rendered = render(&json!({"b": 1, "A": 2, "a": 3, "C": 4})).expect("render");
        let order: Vec<&str> = ["\"A\"", "\"a\"", "\"b\"", "\"C\""]
            .into_iter()
            .filter(|key| rendered.contains(key))
            .collect();
        assert_eq!(order.len(), 4);
        let positions: Vec<usize> = order
            .iter()
            .map(|key| rendered.find(key).expect("key present"))
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_upper_case_tie_break_comes_first() {
        assert_eq!(compare_keys("Name", "name"), Ordering::Less);
        assert_eq!(compare_keys("name", "Name"), Ordering::Greater);
        assert_eq!(compare_keys("age", "Name"), Ordering::Less);
    }

    #[test]
    fn test_non_ascii_keys_fold_to_one_char() {
        assert_eq!(compare_keys("ssb", "ßa"), Ordering::Less);
        assert_eq!(compare_keys("ßa", "ssb"), Ordering::Greater);
        assert_eq!(compare_keys("Éclair", "éclair"), Ordering::Less);
        assert_eq!(compare_keys("éa", "Éb"), Ordering::Less);
    }

    #[test]
    fn test_decimal_text_compares_with_its_own_value() {
        #[derive(Serialize)]
        struct Reading {
            value: f64,
        }

        let reading = Reading {
            value: 0.009_873_893_166_218_721,
        };
        let text = serde_json::to_string(&reading).expect("serialize");

        assert!(is_similar(&reading, &serde_json::from_str::<Value>(&text).expect("parse")).expect("compare"));
        assert_eq!(
            to_canonical_json(&reading).expect("render"),
            canonicalize_str(&text).expect("canonical")
        );
    }

    #[test]
    fn test_large_float_renders_the_same_after_reparse() {
        let once = render(&json!([-3.206_384_385_467_828_4e19])).expect("render");
        assert_eq!(canonicalize_str(&once).expect("canonical"), once);
    }

    #[test]
    fn test_underscore_sorts_after_letters() {
        assert_eq!(compare_keys("a", "_"), Ordering::Less);
    }

    #[test]
    fn test_nested_objects_are_sorted() {
        let rendered = render(&json!({"outer": {"z": 1, "y": [{"b": 1, "a": 2}]}})).expect("render");
        assert_eq!(
            rendered,
            "{\n  \"outer\": {\n    \"y\": [\n      {\n        \"a\": 2,\n        \"b\": 1\n      }\n    ],\n    \"z\": 1\n  }\n}"
        );
    }

    #[test]
    fn test_array_order_preserved() {
        let rendered = render(&json!([3, 1, 2])).expect("render");
        assert_eq!(rendered, "[\n  3,\n  1,\n  2\n]");
    }

    #[test]
    fn test_decimal_formatting() {
        assert_eq!(format_decimal(30.0), "30");
        assert_eq!(format_decimal(1.50), "1.5");
        assert_eq!(format_decimal(-0.0), "0");
        assert_eq!(format_decimal(0.1), "0.1");
        assert_eq!(format_decimal(-2.25), "-2.25");
        assert_eq!(format_decimal(1e-25), "0");
    }

    #[test]
    fn test_float_and_integer_are_similar() {
        assert!(is_similar(&json!({"age": 30.0}), &json!({"age": 30})).expect("compare"));
    }

    #[test]
    fn test_reordered_objects_are_similar() {
        let a = json!({"name": "Alice", "age": 30});
        let b = canonicalize_str(r#"{"age":30,"name":"Alice"}"#).expect("canonical");
        assert_eq!(render(&a).expect("render"), b);
    }

    #[test]
    fn test_different_values_are_not_similar() {
        assert!(!is_similar(&json!({"name": "Alice"}), &json!({"name": "Bob"})).expect("compare"));
    }

    #[test]
    fn test_array_order_matters() {
        assert!(!is_similar(&json!([1, 2]), &json!([2, 1])).expect("compare"));
    }

    #[test]
    fn test_invalid_json_text() {
        assert!(matches!(
            canonicalize_str("{not json"),
            Err(CanonicalError::Parse(_))
        ));
    }

    #[test]
    fn test_pretty_json_keeps_serialization_order() {
        #[derive(Serialize)]
        struct Ordered {
            zeta: u8,
            alpha: u8,
        }
        let rendered = to_pretty_json(&Ordered { zeta: 1, alpha: 2 }).expect("render");
        assert!(rendered.find("zeta") < rendered.find("alpha"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::Map;

    proptest! {
        /// Insertion order of object members never changes the rendering
        #[test]
        fn member_order_is_irrelevant(entries in proptest::collection::btree_map("[a-zA-Z_]{1,6}", any::<i32>(), 0..8)) {
            let forward: Map<String, Value> = entries.iter().map(|(k, v)| (k.clone(), Value::from(*v))).collect();
            let backward: Map<String, Value> = entries.iter().rev().map(|(k, v)| (k.clone(), Value::from(*v))).collect();
            prop_assert_eq!(
                render(&Value::Object(forward)).unwrap(),
                render(&Value::Object(backward)).unwrap()
            );
        }

        /// Rendering is idempotent: canonical text re-canonicalizes to itself
        #[test]
        fn rendering_is_idempotent(values in proptest::collection::vec(any::<f64>().prop_filter("finite", |v| v.is_finite()), 0..6)) {
            let once = render(&Value::from(values)).unwrap();
            let twice = canonicalize_str(&once).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
