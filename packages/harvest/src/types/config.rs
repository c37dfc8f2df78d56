//! Configuration types describing the desired output shape.
//!
//! Every type is `serde`-deserializable with snake_case keys. Optional
//! variants are modelled as `Option` fields; when more than one is set the
//! engine picks by a fixed precedence, documented on each type.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

/// Declared type of a leaf value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Null,
    #[serde(alias = "bool")]
    Boolean,
    #[default]
    String,
    RawString,
    Int,
    Int64,
    Float,
    Float64,
    /// Keep the sub-document as opaque JSON text
    Array,
    /// Keep the sub-document as opaque JSON text
    Object,
}

/// Format of a fetched document, which selects the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    #[default]
    Json,
    Html,
    Xml,
    #[serde(alias = "x_path")]
    Xpath,
}

/// Root resolution target.
///
/// Precedence: `base_field` > `array_config` > `object_config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_field: Option<BaseField>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_config: Option<ArrayConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_config: Option<ObjectConfig>,
}

impl Model {
    /// Model producing a single leaf.
    pub fn base(field: BaseField) -> Self {
        Self {
            base_field: Some(field),
            ..Default::default()
        }
    }

    /// Model producing an object.
    pub fn object(config: ObjectConfig) -> Self {
        Self {
            object_config: Some(config),
            ..Default::default()
        }
    }

    /// Model producing an array.
    pub fn array(config: ArrayConfig) -> Self {
        Self {
            array_config: Some(config),
            ..Default::default()
        }
    }
}

/// A resolution rule for one named or positional slot.
///
/// Precedence: `first_of` > `base_field` > `object_config` > `array_config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Field {
    /// Ordered alternatives; the first non-empty result wins
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub first_of: Vec<Field>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_field: Option<BaseField>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_config: Option<ObjectConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_config: Option<ArrayConfig>,
}

impl Field {
    pub fn base(field: BaseField) -> Self {
        Self {
            base_field: Some(field),
            ..Default::default()
        }
    }

    pub fn object(config: ObjectConfig) -> Self {
        Self {
            object_config: Some(config),
            ..Default::default()
        }
    }

    pub fn array(config: ArrayConfig) -> Self {
        Self {
            array_config: Some(config),
            ..Default::default()
        }
    }

    pub fn first_of(candidates: impl IntoIterator<Item = Field>) -> Self {
        Self {
            first_of: candidates.into_iter().collect(),
            ..Default::default()
        }
    }
}

/// Leaf rule: query a node and parse its text into a typed value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseField {
    #[serde(default, rename = "type")]
    pub field_type: FieldType,

    /// Backend query; empty means the current node
    #[serde(default)]
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<Box<GeneratedFieldConfig>>,

    /// Leaf-level alternatives; the first non-empty result wins
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub first_of: Vec<BaseField>,
}

impl BaseField {
    /// Create a leaf rule for a path and type.
    pub fn new(field_type: FieldType, path: impl Into<String>) -> Self {
        Self {
            field_type,
            path: path.into(),
            ..Default::default()
        }
    }

    /// Attach a generator fed with this leaf's parsed value.
    pub fn with_generated(mut self, generated: GeneratedFieldConfig) -> Self {
        self.generated = Some(Box::new(generated));
        self
    }

    /// Leaf whose value comes from ordered alternatives.
    pub fn first_of(candidates: impl IntoIterator<Item = BaseField>) -> Self {
        Self {
            first_of: candidates.into_iter().collect(),
            ..Default::default()
        }
    }
}

/// Object rule (also used as the per-item rule of dynamic arrays).
///
/// Precedence: `field` > `array_config` > `fields`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectConfig {
    /// Named fields, emitted in declared order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, Field>,

    /// Single scalar resolved against the current node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<BaseField>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_config: Option<Box<ArrayConfig>>,
}

impl ObjectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named field.
    pub fn with_field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Rule producing a scalar instead of an object.
    pub fn scalar(field: BaseField) -> Self {
        Self {
            field: Some(field),
            ..Default::default()
        }
    }

    /// Rule producing a nested array instead of an object.
    pub fn nested(array: ArrayConfig) -> Self {
        Self {
            array_config: Some(Box::new(array)),
            ..Default::default()
        }
    }
}

/// Array rule: either a static index map or a dynamic root path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArrayConfig {
    /// Query selecting the ordered item nodes
    #[serde(default)]
    pub root_path: String,

    #[serde(default)]
    pub reverse: bool,

    /// Maximum output length, 0 means unlimited
    #[serde(default)]
    pub length_limit: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_config: Option<ObjectConfig>,

    /// Takes precedence over the dynamic settings when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_array: Option<StaticArrayConfig>,
}

impl ArrayConfig {
    /// Dynamic array over the nodes selected by `root_path`.
    pub fn dynamic(root_path: impl Into<String>, item_config: ObjectConfig) -> Self {
        Self {
            root_path: root_path.into(),
            item_config: Some(item_config),
            ..Default::default()
        }
    }

    /// Fixed-length array from an explicit index map.
    pub fn fixed(config: StaticArrayConfig) -> Self {
        Self {
            static_array: Some(config),
            ..Default::default()
        }
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn with_length_limit(mut self, limit: u32) -> Self {
        self.length_limit = limit;
        self
    }
}

/// Explicit `index -> Field` mapping with a declared minimum length.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticArrayConfig {
    #[serde(default)]
    pub length: u32,

    #[serde(default)]
    pub items: BTreeMap<u32, Field>,
}

impl StaticArrayConfig {
    pub fn new(length: u32) -> Self {
        Self {
            length,
            items: BTreeMap::new(),
        }
    }

    pub fn with_item(mut self, index: u32, field: Field) -> Self {
        self.items.insert(index, field);
        self
    }
}

/// Synthetic value producers.
///
/// The first set variant wins, in declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedFieldConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<UuidConfig>,

    #[serde(default, rename = "static", skip_serializing_if = "Option::is_none")]
    pub static_value: Option<StaticConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted: Option<FormattedConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculated: Option<CalculatedConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelFieldConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginFieldConfig>,
}

impl GeneratedFieldConfig {
    pub fn uuid(regexp: Option<String>) -> Self {
        Self {
            uuid: Some(UuidConfig { regexp }),
            ..Default::default()
        }
    }

    pub fn static_value(field_type: FieldType, value: impl Into<String>) -> Self {
        Self {
            static_value: Some(StaticConfig {
                field_type,
                value: value.into(),
                raw: None,
            }),
            ..Default::default()
        }
    }

    pub fn formatted(template: impl Into<String>) -> Self {
        Self {
            formatted: Some(FormattedConfig {
                template: template.into(),
            }),
            ..Default::default()
        }
    }

    pub fn calculated(field_type: FieldType, expression: impl Into<String>) -> Self {
        Self {
            calculated: Some(CalculatedConfig {
                field_type,
                expression: expression.into(),
            }),
            ..Default::default()
        }
    }

    pub fn model(config: ModelFieldConfig) -> Self {
        Self {
            model: Some(config),
            ..Default::default()
        }
    }

    pub fn plugin(name: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            plugin: Some(PluginFieldConfig {
                name: name.into(),
                config,
            }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UuidConfig {
    /// Keep only the first match of this pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regexp: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticConfig {
    #[serde(default, rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub value: String,

    /// Literal JSON; its text form takes precedence over `value`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormattedConfig {
    pub template: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalculatedConfig {
    #[serde(default, rename = "type")]
    pub field_type: FieldType,

    pub expression: String,
}

/// Cross-document join: fetch, resolve a sub-model, extract by path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelFieldConfig {
    #[serde(default, rename = "type")]
    pub field_type: FieldType,

    pub model: Model,

    pub connector_config: ConnectorConfig,

    /// Query into the sub-result; empty keeps the whole sub-result
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginFieldConfig {
    pub name: String,

    #[serde(default)]
    pub config: serde_json::Value,
}

/// Describes where a document comes from and how to parse it.
///
/// Source precedence: `static_config` > `server_config` > `plugin_config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectorConfig {
    #[serde(default)]
    pub response_type: ResponseType,

    /// Total tries; 0 and 1 both mean a single try
    #[serde(default)]
    pub attempts: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_config: Option<StaticConnectorConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_config: Option<ServerConnectorConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_config: Option<PluginConnectorConfig>,
}

impl ConnectorConfig {
    /// Connector returning a fixed document.
    pub fn fixed(response_type: ResponseType, value: impl Into<String>) -> Self {
        Self {
            response_type,
            static_config: Some(StaticConnectorConfig {
                value: value.into(),
                raw: None,
            }),
            ..Default::default()
        }
    }

    /// Connector issuing a GET to a URL template.
    pub fn server(response_type: ResponseType, url: impl Into<String>) -> Self {
        Self {
            response_type,
            server_config: Some(ServerConnectorConfig {
                url: url.into(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Connector delegating to a registered plugin.
    pub fn plugin(
        response_type: ResponseType,
        name: impl Into<String>,
        config: serde_json::Value,
    ) -> Self {
        Self {
            response_type,
            plugin_config: Some(PluginConnectorConfig {
                name: name.into(),
                config,
            }),
            ..Default::default()
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticConnectorConfig {
    #[serde(default)]
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConnectorConfig {
    #[serde(default = "default_method")]
    pub method: String,

    pub url: String,

    #[serde(default)]
    pub headers: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ServerConnectorConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            url: String::new(),
            headers: IndexMap::new(),
            body: None,
            timeout_secs: None,
        }
    }
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginConnectorConfig {
    pub name: String,

    #[serde(default)]
    pub config: serde_json::Value,
}

/// One extraction target: where to fetch and what shape to build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub name: String,

    pub connector_config: ConnectorConfig,

    pub model: Model,
}

/// Named value resolved once per process and read through `RefName=` tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub connector_config: ConnectorConfig,

    pub model: Model,
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub items: Vec<Item>,

    #[serde(default)]
    pub references: IndexMap<String, Reference>,
}

impl Config {
    /// Decode a config from JSON text.
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and decode a config file.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Find an item by name.
    pub fn item(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_nested_config() {
        let text = r#"{
            "items": [{
                "name": "repos",
                "connector_config": {
                    "response_type": "json",
                    "attempts": 3,
                    "server_config": { "url": "https://api.example.com/repos" }
                },
                "model": {
                    "array_config": {
                        "root_path": "items",
                        "length_limit": 5,
                        "item_config": {
                            "fields": {
                                "name": { "base_field": { "type": "string", "path": "name" } },
                                "stars": { "base_field": { "type": "int", "path": "stars" } }
                            }
                        }
                    }
                }
            }],
            "references": {
                "token": {
                    "connector_config": { "static_config": { "value": "{\"t\":\"abc\"}" } },
                    "model": { "base_field": { "path": "t" } }
                }
            }
        }"#;

        let config = Config::from_json(text).unwrap();
        let item = config.item("repos").unwrap();
        assert_eq!(item.connector_config.attempts, 3);
        assert_eq!(
            item.connector_config.server_config.as_ref().unwrap().method,
            "GET"
        );

        let array = item.model.array_config.as_ref().unwrap();
        assert_eq!(array.length_limit, 5);
        let fields = &array.item_config.as_ref().unwrap().fields;
        let names: Vec<_> = fields.keys().cloned().collect();
        assert_eq!(names, vec!["name", "stars"]);
        assert_eq!(
            fields["stars"].base_field.as_ref().unwrap().field_type,
            FieldType::Int
        );
        assert!(config.references.contains_key("token"));
    }

    #[test]
    fn test_decode_static_array_and_generated() {
        let text = r#"{
            "static_array": {
                "length": 3,
                "items": {
                    "0": { "base_field": {
                        "type": "int",
                        "generated": { "static": { "type": "int", "value": "7" } }
                    } }
                }
            }
        }"#;

        let array: ArrayConfig = serde_json::from_str(text).unwrap();
        let fixed = array.static_array.unwrap();
        assert_eq!(fixed.length, 3);
        let generated = fixed.items[&0]
            .base_field
            .as_ref()
            .unwrap()
            .generated
            .as_ref()
            .unwrap();
        assert_eq!(generated.static_value.as_ref().unwrap().value, "7");
    }

    #[test]
    fn test_field_type_aliases() {
        let t: FieldType = serde_json::from_str("\"bool\"").unwrap();
        assert_eq!(t, FieldType::Boolean);
        let r: ResponseType = serde_json::from_str("\"xpath\"").unwrap();
        assert_eq!(r, ResponseType::Xpath);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Config::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
