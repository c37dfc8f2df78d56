//! Configuration types for the harvest library.

pub mod config;

pub use config::{
    ArrayConfig, BaseField, CalculatedConfig, Config, ConnectorConfig, Field, FieldType,
    FormattedConfig, GeneratedFieldConfig, Item, Model, ModelFieldConfig, ObjectConfig,
    PluginConnectorConfig, PluginFieldConfig, Reference, ResponseType, ServerConnectorConfig,
    StaticArrayConfig, StaticConfig, StaticConnectorConfig, UuidConfig,
};
