//! Text and native-value coercion into declared field types.
//!
//! Unparsable input yields `Null`, never an error.

use serde_json::Value as JsonValue;

use super::{json_text, to_jsonable, Value};
use crate::types::config::FieldType;

/// Parse extracted text into a value of the declared type.
///
/// `Array` and `Object` keep the text verbatim as a JSON fragment when it is
/// well-formed JSON; anything else becomes `Null` so the output stays valid.
pub fn parse_scalar(text: &str, field_type: FieldType) -> Value {
    match field_type {
        FieldType::Null => Value::Null,
        FieldType::Boolean => parse_bool(text.trim()).map_or(Value::Null, Value::Bool),
        FieldType::String => Value::String(text.to_string()),
        FieldType::RawString => Value::RawString(text.to_string()),
        FieldType::Int => text.trim().parse().map_or(Value::Null, Value::Int),
        FieldType::Int64 => text.trim().parse().map_or(Value::Null, Value::Int64),
        FieldType::Float => text
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|f| f.is_finite())
            .map_or(Value::Null, Value::Float),
        FieldType::Float64 => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map_or(Value::Null, Value::Float64),
        FieldType::Array | FieldType::Object => {
            let trimmed = text.trim();
            if serde_json::from_str::<JsonValue>(trimmed).is_ok() {
                Value::PureString(trimmed.to_string())
            } else {
                Value::Null
            }
        }
    }
}

/// Coerce a native value (expression result, join extraction) into a type.
pub fn coerce_json(native: &JsonValue, field_type: FieldType) -> Value {
    match (field_type, native) {
        (_, JsonValue::Null) | (FieldType::Null, _) => Value::Null,
        (FieldType::Boolean, JsonValue::Bool(b)) => Value::Bool(*b),
        (FieldType::Int, JsonValue::Number(n)) => number_as_i64(n)
            .and_then(|i| i32::try_from(i).ok())
            .map_or(Value::Null, Value::Int),
        (FieldType::Int64, JsonValue::Number(n)) => {
            number_as_i64(n).map_or(Value::Null, Value::Int64)
        }
        (FieldType::Float, JsonValue::Number(n)) => n
            .as_f64()
            .map(|f| f as f32)
            .filter(|f| f.is_finite())
            .map_or(Value::Null, Value::Float),
        (FieldType::Float64, JsonValue::Number(n)) => n.as_f64().map_or(Value::Null, Value::Float64),
        (FieldType::Array, JsonValue::Array(_)) | (FieldType::Object, JsonValue::Object(_)) => {
            to_jsonable(native)
        }
        (FieldType::Array | FieldType::Object, JsonValue::String(s)) => parse_scalar(s, field_type),
        (FieldType::Array | FieldType::Object, _) => Value::Null,
        (_, other) => parse_scalar(&json_text(other), field_type),
    }
}

/// Truncating integer view of a JSON number.
fn number_as_i64(n: &serde_json::Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
            .map(|f| f.trunc() as i64)
    })
}

/// Boolean literals in the forms `1 t T TRUE true True` and their negations.
fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_scalar(" 42 ", FieldType::Int), Value::Int(42));
        assert_eq!(parse_scalar("4.2", FieldType::Int), Value::Null);
        assert_eq!(
            parse_scalar("9000000000", FieldType::Int64),
            Value::Int64(9_000_000_000)
        );
        assert_eq!(parse_scalar("9000000000", FieldType::Int), Value::Null);
        assert_eq!(parse_scalar("1.5", FieldType::Float64), Value::Float64(1.5));
        assert_eq!(parse_scalar("NaN", FieldType::Float64), Value::Null);
        assert_eq!(parse_scalar("abc", FieldType::Float), Value::Null);
    }

    #[test]
    fn test_parse_bool_and_strings() {
        assert_eq!(parse_scalar("True", FieldType::Boolean), Value::Bool(true));
        assert_eq!(parse_scalar("0", FieldType::Boolean), Value::Bool(false));
        assert_eq!(parse_scalar("yes", FieldType::Boolean), Value::Null);
        assert_eq!(
            parse_scalar(" keep ", FieldType::String),
            Value::String(" keep ".into())
        );
        assert_eq!(parse_scalar("x", FieldType::Null), Value::Null);
    }

    #[test]
    fn test_parse_opaque_json() {
        assert_eq!(
            parse_scalar("[1, 2]", FieldType::Array),
            Value::PureString("[1, 2]".into())
        );
        assert_eq!(parse_scalar("<div>", FieldType::Object), Value::Null);
        assert_eq!(parse_scalar("", FieldType::Array), Value::Null);
    }

    #[test]
    fn test_coerce_json() {
        assert_eq!(coerce_json(&json!(7.9), FieldType::Int), Value::Int(7));
        assert_eq!(coerce_json(&json!(3), FieldType::Float64), Value::Float64(3.0));
        assert_eq!(coerce_json(&json!("12"), FieldType::Int64), Value::Int64(12));
        assert_eq!(coerce_json(&json!(true), FieldType::String), Value::String("true".into()));
        assert_eq!(coerce_json(&json!(1), FieldType::Boolean), Value::Bool(true));
        assert_eq!(coerce_json(&json!(null), FieldType::String), Value::Null);
        assert_eq!(
            coerce_json(&json!([1, "a"]), FieldType::Array),
            Value::Array(vec![Value::Int64(1), Value::String("a".into())])
        );
        assert_eq!(coerce_json(&json!({"a": 1}), FieldType::Array), Value::Null);
        assert_eq!(
            coerce_json(&json!("{\"a\":1}"), FieldType::Object),
            Value::PureString("{\"a\":1}".into())
        );
    }
}
