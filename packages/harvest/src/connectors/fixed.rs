//! Connector returning a document written into the configuration.

use async_trait::async_trait;
use std::sync::Arc;

use super::Connector;
use crate::context::Context;
use crate::error::ConnectorResult;
use crate::references::RefStore;
use crate::template::{render, Scope};
use crate::types::config::StaticConnectorConfig;
use crate::value::{json_text, Value};

/// Literal document source. The literal is template-rendered per fetch.
pub struct StaticConnector {
    template: String,
    references: Arc<RefStore>,
}

impl StaticConnector {
    /// `raw` JSON takes precedence over `value`.
    pub fn new(context: &Context, config: &StaticConnectorConfig) -> Self {
        let template = match &config.raw {
            Some(raw) => json_text(raw),
            None => config.value.clone(),
        };
        Self {
            template,
            references: context.shared_references(),
        }
    }
}

#[async_trait]
impl Connector for StaticConnector {
    async fn fetch(&self, value: Option<&Value>, index: Option<u32>) -> ConnectorResult<Vec<u8>> {
        let scope = Scope::new(value, index).with_references(&self.references);
        Ok(render(&self.template, &scope).into_bytes())
    }

    fn name(&self) -> &str {
        "static"
    }
}
