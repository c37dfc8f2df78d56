//! Mock connector for testing.
//!
//! Serves canned bodies keyed by rendered URL template, with injectable
//! failures and random delays. Usable directly as a [`Connector`] bound to
//! a URL template, or registered as a [`ConnectorPlugin`] whose config is
//! `{"url": "<template>"}`.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use super::Connector;
use crate::error::{ConnectorError, ConnectorResult};
use crate::plugins::ConnectorPlugin;
use crate::template::{render, Scope};
use crate::value::Value;

/// Mock connector for testing.
///
/// Clones share responses and recorded calls.
///
/// # Example
///
/// ```rust
/// use harvest::connectors::MockConnector;
///
/// let mock = MockConnector::new()
///     .with_response("cities/1", r#"{"name": "Oslo"}"#)
///     .with_outage("cities/2");
/// assert_eq!(mock.call_count(), 0);
/// ```
#[derive(Default, Clone)]
pub struct MockConnector {
    /// Canned bodies indexed by rendered URL
    responses: Arc<RwLock<HashMap<String, String>>>,
    /// Remaining failures per URL
    failures: Arc<RwLock<HashMap<String, usize>>>,
    /// Upper bound for a random delay before each response
    max_delay: Option<Duration>,
    /// Rendered URLs in call order
    calls: Arc<RwLock<Vec<String>>>,
    /// URL template when used as a bound connector
    url: String,
}

impl MockConnector {
    /// Create a new empty mock connector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body served for `url`.
    pub fn add_response(&self, url: impl Into<String>, body: impl Into<String>) {
        self.responses
            .write()
            .unwrap()
            .insert(url.into(), body.into());
    }

    /// Builder form of [`add_response`](Self::add_response).
    pub fn with_response(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.add_response(url, body);
        self
    }

    /// Fail the next `count` fetches of `url`.
    pub fn with_failures(self, url: impl Into<String>, count: usize) -> Self {
        self.failures.write().unwrap().insert(url.into(), count);
        self
    }

    /// Fail every fetch of `url`.
    pub fn with_outage(self, url: impl Into<String>) -> Self {
        self.with_failures(url, usize::MAX)
    }

    /// Sleep a random duration up to `max` before each response.
    pub fn with_random_delay(mut self, max: Duration) -> Self {
        self.max_delay = Some(max);
        self
    }

    /// Bind to a URL template, for use as a plain [`Connector`].
    pub fn for_url(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..self.clone()
        }
    }

    /// Get the number of fetches made.
    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Get the rendered URLs fetched, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    /// Number of fetches of one URL.
    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.read().unwrap().iter().filter(|c| *c == url).count()
    }

    /// Clear all recorded calls.
    pub fn reset_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    async fn respond(&self, url: String) -> ConnectorResult<Vec<u8>> {
        self.calls.write().unwrap().push(url.clone());

        if let Some(max) = self.max_delay {
            let millis = fastrand::u64(0..=max.as_millis() as u64);
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }

        {
            let mut failures = self.failures.write().unwrap();
            if let Some(remaining) = failures.get_mut(&url) {
                if *remaining > 0 {
                    if *remaining != usize::MAX {
                        *remaining -= 1;
                    }
                    return Err(ConnectorError::Unavailable(url));
                }
            }
        }

        match self.responses.read().unwrap().get(&url) {
            Some(body) => Ok(body.clone().into_bytes()),
            None => Err(ConnectorError::Status { status: 404, url }),
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn fetch(&self, value: Option<&Value>, index: Option<u32>) -> ConnectorResult<Vec<u8>> {
        let url = render(&self.url, &Scope::new(value, index));
        self.respond(url).await
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[async_trait]
impl ConnectorPlugin for MockConnector {
    async fn fetch(
        &self,
        config: &JsonValue,
        value: Option<&Value>,
        index: Option<u32>,
    ) -> ConnectorResult<Vec<u8>> {
        let template = match config {
            JsonValue::String(url) => url.as_str(),
            other => other.get("url").and_then(JsonValue::as_str).unwrap_or_default(),
        };
        let url = render(template, &Scope::new(value, index));
        self.respond(url).await
    }
}
