//! Document sources.
//!
//! A [`Connector`] fetches the bytes of a document, given the value and
//! index of the field that triggered the fetch (used to render URL, header
//! and body templates).
//!
//! # Available Connectors
//!
//! - `StaticConnector` - a literal document from the configuration
//! - `HttpConnector` - HTTP requests via `reqwest`
//! - `PluginConnector` - delegates to a registered [`ConnectorPlugin`](crate::plugins::ConnectorPlugin)
//! - `RetryConnector` - retries another connector
//! - `MockConnector` - canned responses for tests

mod fixed;
mod http;
mod limiter;
mod mock;
mod plugin;
mod retry;

pub use fixed::StaticConnector;
pub use http::HttpConnector;
pub use limiter::ResourceLimiter;
pub use mock::MockConnector;
pub use plugin::PluginConnector;
pub use retry::RetryConnector;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::{ConnectorError, ConnectorResult};
use crate::types::config::ConnectorConfig;
use crate::value::Value;

/// Fetches documents for the engine.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Fetch a document for the given field value and array index.
    async fn fetch(&self, value: Option<&Value>, index: Option<u32>) -> ConnectorResult<Vec<u8>>;

    /// Connector name (for logging).
    fn name(&self) -> &str;
}

/// Build the connector a config describes.
///
/// Source precedence is `static_config`, `server_config`, `plugin_config`.
/// More than one attempt wraps the source in a [`RetryConnector`].
pub fn build_connector(
    context: &Context,
    config: &ConnectorConfig,
) -> ConnectorResult<Box<dyn Connector>> {
    let source: Box<dyn Connector> = if let Some(fixed) = &config.static_config {
        Box::new(StaticConnector::new(context, fixed))
    } else if let Some(server) = &config.server_config {
        Box::new(HttpConnector::new(context, server))
    } else if let Some(plugin) = &config.plugin_config {
        Box::new(PluginConnector::new(context, plugin)?)
    } else {
        return Err(ConnectorError::NoSource);
    };

    if config.attempts > 1 {
        Ok(Box::new(RetryConnector::new(source, config.attempts)))
    } else {
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::config::ResponseType;
    use serde_json::json;

    #[tokio::test]
    async fn test_static_source_wins() {
        let mut config = ConnectorConfig::fixed(ResponseType::Json, "{\"a\":1}");
        config.plugin_config = ConnectorConfig::plugin(ResponseType::Json, "x", json!({})).plugin_config;

        let connector = build_connector(&Context::default(), &config).unwrap();
        assert_eq!(connector.name(), "static");
        assert_eq!(connector.fetch(None, None).await.unwrap(), b"{\"a\":1}");
    }

    #[test]
    fn test_attempts_wrap_in_retry() {
        let context = Context::default();
        let config = ConnectorConfig::server(ResponseType::Html, "https://example.com");

        assert_eq!(build_connector(&context, &config).unwrap().name(), "http");
        assert_eq!(
            build_connector(&context, &config.clone().with_attempts(3))
                .unwrap()
                .name(),
            "retry"
        );
        assert_eq!(
            build_connector(&context, &config.with_attempts(1)).unwrap().name(),
            "http"
        );
    }

    #[test]
    fn test_missing_source_and_plugin() {
        let context = Context::default();
        assert!(matches!(
            build_connector(&context, &ConnectorConfig::default()),
            Err(ConnectorError::NoSource)
        ));
        assert!(matches!(
            build_connector(&context, &ConnectorConfig::plugin(ResponseType::Json, "nope", json!(null))),
            Err(ConnectorError::UnknownPlugin { name }) if name == "nope"
        ));
    }
}
