//! HTTP connector.
//!
//! URL, header values and body are templates rendered against the field
//! value and index of each fetch.

use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{Connector, ResourceLimiter};
use crate::context::Context;
use crate::error::{ConnectorError, ConnectorResult};
use crate::references::RefStore;
use crate::template::{render, Scope};
use crate::types::config::ServerConnectorConfig;
use crate::value::Value;

/// Connector issuing one HTTP request per fetch.
pub struct HttpConnector {
    config: ServerConnectorConfig,
    client: reqwest::Client,
    limiter: Arc<ResourceLimiter>,
    references: Arc<RefStore>,
}

impl HttpConnector {
    pub fn new(context: &Context, config: &ServerConnectorConfig) -> Self {
        Self {
            config: config.clone(),
            client: context.client().clone(),
            limiter: Arc::clone(context.limiter()),
            references: context.shared_references(),
        }
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn fetch(&self, value: Option<&Value>, index: Option<u32>) -> ConnectorResult<Vec<u8>> {
        let scope = Scope::new(value, index).with_references(&self.references);

        let rendered = render(&self.config.url, &scope);
        let url = Url::parse(rendered.trim()).map_err(|_| ConnectorError::InvalidUrl {
            url: rendered.clone(),
        })?;
        let method = Method::from_bytes(self.config.method.trim().to_uppercase().as_bytes())
            .map_err(|_| ConnectorError::InvalidMethod {
                method: self.config.method.clone(),
            })?;

        let mut request = self.client.request(method.clone(), url.clone());
        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), render(value, &scope));
        }
        if let Some(body) = &self.config.body {
            request = request.body(render(body, &scope));
        }
        if let Some(secs) = self.config.timeout_secs {
            request = request.timeout(Duration::from_secs(secs));
        }

        let _permit = self.limiter.acquire(url.host_str().unwrap_or_default()).await?;

        debug!(method = %method, url = %url, "HTTP fetch starting");
        let response = request.send().await.map_err(|e| {
            warn!(url = %url, error = %e, "HTTP request failed");
            ConnectorError::Http(Box::new(e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectorError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ConnectorError::Http(Box::new(e)))?;
        debug!(url = %url, bytes = bytes.len(), "HTTP fetch complete");
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &str {
        "http"
    }
}
