//! Expression evaluation for `Calculated` fields and `FromExp=` tokens.
//!
//! Expressions use the `evalexpr` language. The environment binds:
//! - `fRes` - the base value in native form
//! - `fResJson` - the base value's JSON text
//! - `fIndex` - the array index, when inside an array

use evalexpr::{
    build_operator_tree, ContextWithMutableVariables, EvalexprError, HashMapContext,
    Value as ExprValue,
};
use serde_json::{Number, Value as JsonValue};

use crate::value::Value;

/// Compile and run `expression` against a value and index.
///
/// Returns the result in native form; objects bound into the environment
/// are seen by the expression as their JSON text.
pub fn evaluate(
    expression: &str,
    value: Option<&Value>,
    index: Option<u32>,
) -> Result<JsonValue, EvalexprError> {
    let tree = build_operator_tree(expression)?;

    let mut context = HashMapContext::new();
    if let Some(value) = value {
        context.set_value("fRes".to_string(), to_expr(&value.raw()))?;
        context.set_value("fResJson".to_string(), ExprValue::String(value.to_json()))?;
    }
    if let Some(index) = index {
        context.set_value("fIndex".to_string(), ExprValue::Int(i64::from(index)))?;
    }

    let result = tree.eval_with_context(&context)?;
    Ok(from_expr(&result))
}

fn to_expr(native: &JsonValue) -> ExprValue {
    match native {
        JsonValue::Null => ExprValue::Empty,
        JsonValue::Bool(b) => ExprValue::Boolean(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => ExprValue::Int(i),
            None => ExprValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => ExprValue::String(s.clone()),
        JsonValue::Array(items) => ExprValue::Tuple(items.iter().map(to_expr).collect()),
        JsonValue::Object(_) => ExprValue::String(native.to_string()),
    }
}

fn from_expr(value: &ExprValue) -> JsonValue {
    match value {
        ExprValue::String(s) => JsonValue::String(s.clone()),
        ExprValue::Float(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
        ExprValue::Int(i) => JsonValue::from(*i),
        ExprValue::Boolean(b) => JsonValue::Bool(*b),
        ExprValue::Tuple(items) => JsonValue::Array(items.iter().map(from_expr).collect()),
        ExprValue::Empty => JsonValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arithmetic_on_bound_value() {
        let value = Value::Int(21);
        assert_eq!(evaluate("fRes * 2", Some(&value), None).unwrap(), json!(42));
        assert_eq!(
            evaluate("fRes / 2.0", Some(&Value::Float64(5.0)), None).unwrap(),
            json!(2.5)
        );
    }

    #[test]
    fn test_index_and_strings() {
        let value = Value::String("item".into());
        assert_eq!(
            evaluate("fRes + \"-\" + str::from(fIndex + 1)", Some(&value), Some(2)).unwrap(),
            json!("item-3")
        );
        assert_eq!(
            evaluate("fResJson", Some(&value), None).unwrap(),
            json!("\"item\"")
        );
    }

    #[test]
    fn test_booleans_and_tuples() {
        let value = Value::Array(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(evaluate("len(fRes) == 2", Some(&value), None).unwrap(), json!(true));
        assert_eq!(evaluate("(1, \"a\")", None, None).unwrap(), json!([1, "a"]));
    }

    #[test]
    fn test_failures() {
        assert!(evaluate("1 +", None, None).is_err());
        assert!(evaluate("fRes + 1", None, None).is_err());
        assert!(evaluate("\"a\" * 2", None, None).is_err());
    }
}
