//! Typed, immutable value nodes produced by the engine.
//!
//! A [`Value`] has three views:
//! - [`Value::to_json`] - canonical JSON text, the output format
//! - [`Value::is_empty`] - semantic emptiness, used by `first_of`
//! - [`Value::raw`] - native form (`serde_json::Value`), used for
//!   re-serialization and as the expression-language binding
//!
//! [`to_jsonable`] is the left inverse of [`Value::raw`].

mod scalar;

pub use scalar::{coerce_json, parse_scalar};

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

/// Largest integer a float can carry without losing precision (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A node of the output tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    Int64(i64),
    Float(f32),
    Float64(f64),
    /// Float that serializes without a decimal point when integral
    Number(f64),
    /// Text, HTML-entity escaped then JSON-quoted on output
    String(String),
    /// Text, JSON-quoted on output without entity escaping
    RawString(String),
    /// Pre-serialized JSON fragment, emitted verbatim
    PureString(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Canonical JSON text.
    pub fn to_json(&self) -> String {
        let mut out = String::new();
        self.write_json(&mut out);
        out
    }

    fn write_json(&self, out: &mut String) {
        match self {
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Int(i) => out.push_str(&i.to_string()),
            Value::Int64(i) => out.push_str(&i.to_string()),
            Value::Float(f) => out.push_str(&format_float(widen(*f), f.is_finite(), || {
                f.to_string()
            })),
            Value::Float64(f) => out.push_str(&format_float(*f, f.is_finite(), || f.to_string())),
            Value::Number(f) => out.push_str(&format_number(*f)),
            Value::String(s) => out.push_str(&quote(&escape_html(s))),
            Value::RawString(s) => out.push_str(&quote(strip_quotes(s))),
            Value::PureString(s) => out.push_str(s),
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_json(out);
                }
                out.push(']');
            }
            Value::Object(entries) => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(&quote(key));
                    out.push(':');
                    value.write_json(out);
                }
                out.push('}');
            }
        }
    }

    /// Semantic emptiness.
    ///
    /// Null is always empty, scalars never are, strings when zero-length,
    /// containers when they have no elements or all elements are empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(_)
            | Value::Int(_)
            | Value::Int64(_)
            | Value::Float(_)
            | Value::Float64(_)
            | Value::Number(_) => false,
            Value::String(s) | Value::RawString(s) | Value::PureString(s) => s.is_empty(),
            Value::Array(items) => items.iter().all(Value::is_empty),
            Value::Object(entries) => entries.values().all(Value::is_empty),
        }
    }

    /// Native form.
    pub fn raw(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Int64(i) => JsonValue::from(*i),
            Value::Float(f) if f.is_finite() => JsonValue::from(widen(*f)),
            Value::Float(_) => JsonValue::Null,
            Value::Float64(f) => JsonValue::from(*f),
            Value::Number(f) => match integral(*f) {
                Some(i) => JsonValue::from(i),
                None => JsonValue::from(*f),
            },
            Value::String(s) => JsonValue::String(s.clone()),
            Value::RawString(s) => JsonValue::String(strip_quotes(s).to_string()),
            Value::PureString(s) => serde_json::from_str(s)
                .unwrap_or_else(|_| JsonValue::String(strip_quotes(s).to_string())),
            Value::Array(items) => JsonValue::Array(items.iter().map(Value::raw).collect()),
            Value::Object(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.raw()))
                    .collect(),
            ),
        }
    }

    /// Plain text form: strings without quotes, everything else as JSON.
    ///
    /// This is what template tokens and `first_of` text comparisons see.
    pub fn text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::RawString(s) => strip_quotes(s).to_string(),
            other => json_text(&other.raw()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&JsonValue> for Value {
    fn from(value: &JsonValue) -> Self {
        to_jsonable(value)
    }
}

/// Rebuild a value node from its native form.
///
/// Left inverse of [`Value::raw`]: `to_jsonable(&v.raw()).raw() == v.raw()`.
pub fn to_jsonable(native: &JsonValue) -> Value {
    match native {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int64(i)
            } else if n.is_u64() {
                // Beyond i64: keep the exact digits
                Value::PureString(n.to_string())
            } else {
                // Integral floats (`3.0`) keep their float spelling
                n.as_f64().map_or(Value::Null, |f| match integral(f) {
                    Some(_) => Value::Float64(f),
                    None => Value::Number(f),
                })
            }
        }
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Array(items) => Value::Array(items.iter().map(to_jsonable).collect()),
        JsonValue::Object(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), to_jsonable(value)))
                .collect(),
        ),
    }
}

/// Text form of a native value: strings unquoted, the rest as JSON.
pub fn json_text(native: &JsonValue) -> String {
    match native {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// HTML-entity escaping of `& < > ' "`.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&#34;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON string literal for `text`.
fn quote(text: &str) -> String {
    JsonValue::String(text.to_string()).to_string()
}

/// Drop one pair of surrounding double quotes, if present.
fn strip_quotes(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(text)
}

/// Widen through the shortest decimal form, so 0.1f32 becomes 0.1f64.
fn widen(f: f32) -> f64 {
    f.to_string().parse().unwrap_or_else(|_| f64::from(f))
}

fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER {
        Some(f as i64)
    } else {
        None
    }
}

fn format_number(f: f64) -> String {
    match integral(f) {
        Some(i) => i.to_string(),
        None => format_float(f, f.is_finite(), || f.to_string()),
    }
}

fn format_float(f: f64, finite: bool, display: impl FnOnce() -> String) -> String {
    if !finite {
        return "null".to_string();
    }
    // Display never uses exponents; very large or small magnitudes go
    // through serde_json, which does
    if f != 0.0 && !(1e-6..1e21).contains(&f.abs()) {
        return JsonValue::from(f).to_string();
    }
    display()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn object(entries: &[(&str, Value)]) -> Value {
        Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_emptiness_laws() {
        assert!(Value::Null.is_empty());
        assert!(Value::Array(vec![]).is_empty());
        assert!(Value::Array(vec![Value::Null]).is_empty());
        assert!(!Value::Array(vec![Value::Int(0)]).is_empty());
        assert!(Value::Object(IndexMap::new()).is_empty());
        assert!(object(&[("a", Value::Null), ("b", Value::String(String::new()))]).is_empty());
        assert!(!object(&[("a", Value::Bool(false))]).is_empty());
        assert!(Value::String(String::new()).is_empty());
        assert!(!Value::String(" ".into()).is_empty());
        assert!(!Value::Float64(0.0).is_empty());
    }

    #[test]
    fn test_number_canonicalization() {
        assert_eq!(Value::Number(5.0).to_json(), "5");
        assert_eq!(Value::Number(5.5).to_json(), "5.5");
        assert_eq!(Value::Number(-3.0).to_json(), "-3");
        assert_eq!(Value::Number(5.0).raw(), serde_json::json!(5));
        assert_eq!(Value::Number(f64::NAN).to_json(), "null");
    }

    #[test]
    fn test_floats() {
        assert_eq!(Value::Float(0.1).to_json(), "0.1");
        assert_eq!(Value::Float(0.1).raw(), serde_json::json!(0.1));
        assert_eq!(Value::Float64(2.25).to_json(), "2.25");
        assert_eq!(Value::Float64(f64::INFINITY).to_json(), "null");

        // Tiny magnitudes: text and native form agree
        let tiny = Value::Float(1e-7);
        assert_eq!(tiny.to_json(), "1e-7");
        assert_eq!(tiny.to_json(), tiny.raw().to_string());
    }

    #[test]
    fn test_native_floats_become_numbers() {
        assert_eq!(to_jsonable(&serde_json::json!(2.5)), Value::Number(2.5));
        assert_eq!(to_jsonable(&serde_json::json!(3.0)), Value::Float64(3.0));
        assert_eq!(to_jsonable(&serde_json::json!(3)), Value::Int64(3));
        assert_eq!(to_jsonable(&serde_json::json!([0.25])).to_json(), "[0.25]");
    }

    #[test]
    fn test_string_is_entity_escaped_then_quoted() {
        let v = Value::String(r#"<a href="x">Tom & 'Jerry'</a>"#.into());
        assert_eq!(
            v.to_json(),
            r#""&lt;a href=&#34;x&#34;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;""#
        );
        // The native form keeps the original text
        assert_eq!(v.raw(), serde_json::json!(r#"<a href="x">Tom & 'Jerry'</a>"#));

        let multiline = Value::String("a\nb".into());
        assert_eq!(multiline.to_json(), r#""a\nb""#);
    }

    #[test]
    fn test_raw_and_pure_strings() {
        let raw = Value::RawString("\"<b>\"".into());
        assert_eq!(raw.to_json(), r#""<b>""#);
        assert_eq!(raw.raw(), serde_json::json!("<b>"));

        let pure = Value::PureString(r#"{"a":[1,2]}"#.into());
        assert_eq!(pure.to_json(), r#"{"a":[1,2]}"#);
        assert_eq!(pure.raw(), serde_json::json!({"a": [1, 2]}));

        let not_json = Value::PureString("\"hello".into());
        assert_eq!(not_json.raw(), serde_json::json!("\"hello"));
    }

    #[test]
    fn test_containers_serialize_in_order() {
        let v = object(&[
            ("z", Value::Int(1)),
            ("a", Value::Array(vec![Value::Bool(true), Value::Null])),
        ]);
        assert_eq!(v.to_json(), r#"{"z":1,"a":[true,null]}"#);
    }

    #[test]
    fn test_text_form() {
        assert_eq!(Value::String("x".into()).text(), "x");
        assert_eq!(Value::Int(4).text(), "4");
        assert_eq!(Value::Null.text(), "null");
        assert_eq!(
            object(&[("k", Value::String("v".into()))]).text(),
            r#"{"k":"v"}"#
        );
    }

    #[test]
    fn test_nested_round_trip() {
        let v = Value::Array(vec![object(&[
            (
                "inner",
                Value::Array(vec![
                    Value::Int64(i64::MAX),
                    Value::Number(2.0),
                    Value::Float(1.5),
                    Value::PureString("[1,{\"x\":null}]".into()),
                ]),
            ),
            ("name", Value::RawString("n".into())),
        ])]);
        assert_eq!(to_jsonable(&v.raw()).raw(), v.raw());
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(Value::Int),
            any::<i64>().prop_map(Value::Int64),
            any::<f32>().prop_map(Value::Float),
            any::<f64>().prop_map(Value::Float64),
            any::<f64>().prop_map(Value::Number),
            ".*".prop_map(Value::String),
            ".*".prop_map(Value::RawString),
            "[1-9][0-9]{0,5}".prop_map(Value::PureString),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
                prop::collection::vec(("[a-z]{1,6}", inner), 0..8)
                    .prop_map(|entries| Value::Object(entries.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_to_jsonable_is_left_inverse_of_raw(v in arb_value()) {
            let native = v.raw();
            prop_assert_eq!(to_jsonable(&native).raw(), native);
        }

        #[test]
        fn prop_to_json_is_valid_json(v in arb_value()) {
            let text = v.to_json();
            prop_assert!(serde_json::from_str::<JsonValue>(&text).is_ok(), "{}", text);
        }
    }
}
