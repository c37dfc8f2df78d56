//! Generated fields: values synthesized from a field's base value.
//!
//! Every failure here degrades to `Null` for the field alone.

use regex::Regex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::parse_response;
use crate::backends::json_query;
use crate::connectors::build_connector;
use crate::context::Context;
use crate::template::{evaluate, render, Scope};
use crate::types::config::{
    CalculatedConfig, FieldType, GeneratedFieldConfig, ModelFieldConfig, PluginFieldConfig,
    StaticConfig, UuidConfig,
};
use crate::value::{coerce_json, json_text, parse_scalar, Value};

/// Produce the generated value for a field.
///
/// `base` is the field's value after path extraction; `field_type` is the
/// field's declared type, used by `formatted`.
pub(crate) async fn resolve(
    context: &Context,
    config: &GeneratedFieldConfig,
    field_type: FieldType,
    base: Value,
    index: Option<u32>,
) -> Value {
    let scope = Scope::new(Some(&base), index).with_references(context.references());

    if let Some(uuid) = &config.uuid {
        generate_uuid(uuid)
    } else if let Some(fixed) = &config.static_value {
        static_value(fixed, &scope)
    } else if let Some(formatted) = &config.formatted {
        parse_scalar(&render(&formatted.template, &scope), field_type)
    } else if let Some(calculated) = &config.calculated {
        calculate(calculated, &scope)
    } else if let Some(model) = &config.model {
        join(context, model, &base, index).await
    } else if let Some(plugin) = &config.plugin {
        run_plugin(context, plugin, &base, index).await
    } else {
        base
    }
}

fn generate_uuid(config: &UuidConfig) -> Value {
    let id = Uuid::new_v4().to_string();
    let Some(pattern) = &config.regexp else {
        return Value::String(id);
    };

    match Regex::new(pattern) {
        Ok(re) => re
            .find(&id)
            .map_or(Value::Null, |m| Value::String(m.as_str().to_string())),
        Err(e) => {
            warn!(regexp = %pattern, error = %e, "Invalid UUID filter regex");
            Value::Null
        }
    }
}

fn static_value(config: &StaticConfig, scope: &Scope<'_>) -> Value {
    let literal = match &config.raw {
        Some(raw) => json_text(raw),
        None => config.value.clone(),
    };
    parse_scalar(&render(&literal, scope), config.field_type)
}

fn calculate(config: &CalculatedConfig, scope: &Scope<'_>) -> Value {
    let expression = render(&config.expression, scope);
    match evaluate(&expression, scope.value, scope.index) {
        Ok(result) => coerce_json(&result, config.field_type),
        Err(e) => {
            warn!(expression = %expression, error = %e, "Calculated field failed");
            Value::Null
        }
    }
}

/// Cross-document join: fetch, resolve the sub-model, extract by path.
async fn join(
    context: &Context,
    config: &ModelFieldConfig,
    base: &Value,
    index: Option<u32>,
) -> Value {
    let connector = match build_connector(context, &config.connector_config) {
        Ok(connector) => connector,
        Err(e) => {
            warn!(error = %e, "Cannot build join connector");
            return Value::Null;
        }
    };

    let bytes = match connector.fetch(Some(base), index).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(connector = %connector.name(), error = %e, "Join fetch failed");
            return Value::Null;
        }
    };

    let sub = parse_response(
        context,
        config.connector_config.response_type,
        &bytes,
        &config.model,
    )
    .await;
    if sub.is_null() {
        debug!(connector = %connector.name(), "Join resolved to null");
        return Value::Null;
    }

    extract(sub, &config.path, config.field_type)
}

/// Pick `path` out of a join result and coerce it to `field_type`.
///
/// An empty path keeps the whole result when the declared type is a
/// container of the same kind.
fn extract(sub: Value, path: &str, field_type: FieldType) -> Value {
    let path = path.trim();
    if path.is_empty() {
        return match (field_type, &sub) {
            (FieldType::Array, Value::Array(_)) | (FieldType::Object, Value::Object(_)) => sub,
            _ => coerce_json(&sub.raw(), field_type),
        };
    }

    match json_query(&sub.raw(), path) {
        Some(found) => coerce_json(&found, field_type),
        None => {
            debug!(path = %path, "Join path matched nothing");
            Value::Null
        }
    }
}

async fn run_plugin(
    context: &Context,
    config: &PluginFieldConfig,
    base: &Value,
    index: Option<u32>,
) -> Value {
    match context.registry().field(&config.name) {
        Some(plugin) => plugin.generate(&config.config, base, index).await,
        None => {
            warn!(plugin = %config.name, "No field plugin registered");
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::MockConnector;
    use crate::plugins::Registry;
    use crate::types::config::{BaseField, ConnectorConfig, Field, Model, ObjectConfig, ResponseType};
    use indexmap::IndexMap;
    use serde_json::json;
    use std::sync::Arc;

    async fn run(config: GeneratedFieldConfig, base: Value) -> Value {
        resolve(&Context::default(), &config, FieldType::String, base, Some(2)).await
    }

    #[tokio::test]
    async fn test_uuid() {
        let Value::String(id) = run(GeneratedFieldConfig::uuid(None), Value::Null).await else {
            panic!("expected a string");
        };
        assert!(Uuid::parse_str(&id).is_ok());

        let filtered =
            run(GeneratedFieldConfig::uuid(Some("^[0-9a-f]{8}".into())), Value::Null).await;
        assert!(matches!(filtered, Value::String(s) if s.len() == 8));

        let bad = run(GeneratedFieldConfig::uuid(Some("([".into())), Value::Null).await;
        assert_eq!(bad, Value::Null);
    }

    #[tokio::test]
    async fn test_static() {
        let value = run(GeneratedFieldConfig::static_value(FieldType::Int, "12"), Value::Null).await;
        assert_eq!(value, Value::Int(12));

        let bad = run(GeneratedFieldConfig::static_value(FieldType::Int, "twelve"), Value::Null).await;
        assert_eq!(bad, Value::Null);

        let templated = run(
            GeneratedFieldConfig::static_value(FieldType::Int64, "{{{FromExp=fRes + 1}}}"),
            Value::Int(41),
        )
        .await;
        assert_eq!(templated, Value::Int64(42));

        let mut raw = GeneratedFieldConfig::static_value(FieldType::Array, "ignored");
        raw.static_value.as_mut().unwrap().raw = Some(json!([1, 2]));
        assert_eq!(run(raw, Value::Null).await, Value::PureString("[1,2]".into()));
    }

    #[tokio::test]
    async fn test_formatted_and_calculated() {
        let formatted = run(
            GeneratedFieldConfig::formatted("#{HUMAN_INDEX}: {{{@this}}}"),
            Value::String("Oslo".into()),
        )
        .await;
        assert_eq!(formatted, Value::String("#3: Oslo".into()));

        let calculated = run(
            GeneratedFieldConfig::calculated(FieldType::Float64, "fRes * 1.5"),
            Value::Int(4),
        )
        .await;
        assert_eq!(calculated, Value::Float64(6.0));

        let broken = run(
            GeneratedFieldConfig::calculated(FieldType::Int, "fRes +"),
            Value::Int(4),
        )
        .await;
        assert_eq!(broken, Value::Null);
    }

    #[tokio::test]
    async fn test_join_extracts_by_path() {
        let mock = MockConnector::new().with_response("people/7", r#"{"name": "Ada", "age": 36}"#);
        let context = Context::default()
            .with_registry(Registry::new().with_connector("mock", Arc::new(mock.clone())));

        let join_config = ModelFieldConfig {
            field_type: FieldType::Int,
            model: Model::object(
                ObjectConfig::new()
                    .with_field("name", Field::base(BaseField::new(FieldType::String, "name")))
                    .with_field("age", Field::base(BaseField::new(FieldType::Int, "age"))),
            ),
            connector_config: ConnectorConfig::plugin(
                ResponseType::Json,
                "mock",
                json!({"url": "people/{{{@this}}}"}),
            ),
            path: "age".to_string(),
        };

        let age = resolve(
            &context,
            &GeneratedFieldConfig::model(join_config.clone()),
            FieldType::String,
            Value::Int(7),
            None,
        )
        .await;
        assert_eq!(age, Value::Int(36));

        let whole = resolve(
            &context,
            &GeneratedFieldConfig::model(ModelFieldConfig {
                field_type: FieldType::Object,
                path: String::new(),
                ..join_config.clone()
            }),
            FieldType::String,
            Value::Int(7),
            None,
        )
        .await;
        let mut expected = IndexMap::new();
        expected.insert("name".to_string(), Value::String("Ada".into()));
        expected.insert("age".to_string(), Value::Int(36));
        assert_eq!(whole, Value::Object(expected));

        // Unknown document degrades to null
        let missing = resolve(
            &context,
            &GeneratedFieldConfig::model(join_config),
            FieldType::String,
            Value::Int(8),
            None,
        )
        .await;
        assert_eq!(missing, Value::Null);
        assert_eq!(mock.calls(), vec!["people/7", "people/7", "people/8"]);
    }

    #[tokio::test]
    async fn test_missing_plugin_is_null() {
        let value = run(GeneratedFieldConfig::plugin("nope", json!({})), Value::Int(1)).await;
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_no_variant_keeps_base() {
        let value = run(GeneratedFieldConfig::default(), Value::Int(5)).await;
        assert_eq!(value, Value::Int(5));
    }
}
