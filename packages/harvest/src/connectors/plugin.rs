//! Plugin connector: fetches through a `ConnectorPlugin` looked up by name.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use super::Connector;
use crate::context::Context;
use crate::error::{ConnectorError, ConnectorResult};
use crate::plugins::ConnectorPlugin;
use crate::types::config::PluginConnectorConfig;
use crate::value::Value;

/// Connector backed by a plugin from the registry.
pub struct PluginConnector {
    name: String,
    config: JsonValue,
    plugin: Arc<dyn ConnectorPlugin>,
}

impl PluginConnector {
    /// Look the plugin up by name; unknown names are an error.
    pub fn new(context: &Context, config: &PluginConnectorConfig) -> ConnectorResult<Self> {
        let plugin = context
            .registry()
            .connector(&config.name)
            .ok_or_else(|| ConnectorError::UnknownPlugin {
                name: config.name.clone(),
            })?;
        Ok(Self {
            name: config.name.clone(),
            config: config.config.clone(),
            plugin,
        })
    }
}

#[async_trait]
impl Connector for PluginConnector {
    async fn fetch(&self, value: Option<&Value>, index: Option<u32>) -> ConnectorResult<Vec<u8>> {
        self.plugin.fetch(&self.config, value, index).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
