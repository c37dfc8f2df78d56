//! Capability registry for custom connectors and field generators.
//!
//! The embedding application registers implementations by name at start-up;
//! configurations refer to them through `plugin_config` and `generated.plugin`.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConnectorResult;
use crate::value::Value;

/// Custom document source.
#[async_trait]
pub trait ConnectorPlugin: Send + Sync {
    /// Fetch a document. `config` is the plugin's own configuration block.
    async fn fetch(
        &self,
        config: &JsonValue,
        value: Option<&Value>,
        index: Option<u32>,
    ) -> ConnectorResult<Vec<u8>>;
}

/// Custom generated-field producer.
///
/// Implementations return `Value::Null` on failure.
#[async_trait]
pub trait FieldPlugin: Send + Sync {
    async fn generate(&self, config: &JsonValue, value: &Value, index: Option<u32>) -> Value;
}

/// Name to implementation table.
#[derive(Default, Clone)]
pub struct Registry {
    connectors: HashMap<String, Arc<dyn ConnectorPlugin>>,
    fields: HashMap<String, Arc<dyn FieldPlugin>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_connector(
        &mut self,
        name: impl Into<String>,
        plugin: Arc<dyn ConnectorPlugin>,
    ) -> &mut Self {
        self.connectors.insert(name.into(), plugin);
        self
    }

    pub fn register_field(&mut self, name: impl Into<String>, plugin: Arc<dyn FieldPlugin>) -> &mut Self {
        self.fields.insert(name.into(), plugin);
        self
    }

    /// Builder form of [`register_connector`](Self::register_connector).
    pub fn with_connector(mut self, name: impl Into<String>, plugin: Arc<dyn ConnectorPlugin>) -> Self {
        self.register_connector(name, plugin);
        self
    }

    /// Builder form of [`register_field`](Self::register_field).
    pub fn with_field(mut self, name: impl Into<String>, plugin: Arc<dyn FieldPlugin>) -> Self {
        self.register_field(name, plugin);
        self
    }

    pub fn connector(&self, name: &str) -> Option<Arc<dyn ConnectorPlugin>> {
        self.connectors.get(name).cloned()
    }

    pub fn field(&self, name: &str) -> Option<Arc<dyn FieldPlugin>> {
        self.fields.get(name).cloned()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut connectors: Vec<_> = self.connectors.keys().collect();
        let mut fields: Vec<_> = self.fields.keys().collect();
        connectors.sort();
        fields.sort();
        f.debug_struct("Registry")
            .field("connectors", &connectors)
            .field("fields", &fields)
            .finish()
    }
}
