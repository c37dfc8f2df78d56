//! Top-level entry point: fetch, parse and resolve configured items.

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::connectors::build_connector;
use crate::context::Context;
use crate::engine::parse_response;
use crate::references::populate_references;
use crate::types::config::{Config, Item};
use crate::value::Value;

/// Result of one extraction: canonical JSON text plus its native form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    pub json: String,
    pub raw: JsonValue,
}

impl From<Value> for ParseResult {
    fn from(value: Value) -> Self {
        Self {
            json: value.to_json(),
            raw: value.raw(),
        }
    }
}

impl ParseResult {
    pub fn null() -> Self {
        Value::Null.into()
    }
}

/// Runs items against a shared [`Context`].
#[derive(Debug, Clone, Default)]
pub struct Runner {
    context: Context,
}

impl Runner {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Fetch, parse and resolve one item. A failed fetch yields a null result.
    pub async fn run_item(&self, item: &Item) -> ParseResult {
        let connector = match build_connector(&self.context, &item.connector_config) {
            Ok(connector) => connector,
            Err(e) => {
                warn!(item = %item.name, error = %e, "Cannot build connector");
                return ParseResult::null();
            }
        };

        let bytes = match connector.fetch(None, None).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(item = %item.name, connector = %connector.name(), error = %e, "Fetch failed");
                return ParseResult::null();
            }
        };

        let value = parse_response(
            &self.context,
            item.connector_config.response_type,
            &bytes,
            &item.model,
        )
        .await;
        info!(item = %item.name, empty = value.is_empty(), "Item resolved");
        value.into()
    }

    /// Populate references, then run every item concurrently.
    ///
    /// Results come back in item order, paired with the item name.
    pub async fn run(&self, config: &Config) -> Vec<(String, ParseResult)> {
        info!(items = config.items.len(), references = config.references.len(), "Run starting");
        populate_references(&self.context, &config.references).await;

        let results = join_all(config.items.iter().map(|item| async move {
            (item.name.clone(), self.run_item(item).await)
        }))
        .await;

        info!(items = results.len(), "Run finished");
        results
    }
}
