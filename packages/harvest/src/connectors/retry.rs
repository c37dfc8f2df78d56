//! Retry wrapper.
//!
//! Retries the inner connector until it returns a non-empty body without
//! error, or the attempts run out.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::Connector;
use crate::error::{ConnectorError, ConnectorResult};
use crate::value::Value;

/// Connector wrapper that retries failed or empty fetches.
pub struct RetryConnector {
    inner: Box<dyn Connector>,
    attempts: u32,
}

impl RetryConnector {
    /// Wrap `inner`; `attempts` is the total number of tries (at least one).
    pub fn new(inner: Box<dyn Connector>, attempts: u32) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
        }
    }
}

#[async_trait]
impl Connector for RetryConnector {
    async fn fetch(&self, value: Option<&Value>, index: Option<u32>) -> ConnectorResult<Vec<u8>> {
        let mut last_error = ConnectorError::EmptyResponse;

        for attempt in 1..=self.attempts {
            match self.inner.fetch(value, index).await {
                Ok(body) if !body.iter().all(u8::is_ascii_whitespace) => {
                    if attempt > 1 {
                        debug!(connector = %self.inner.name(), attempt, "Fetch succeeded after retry");
                    }
                    return Ok(body);
                }
                Ok(_) => {
                    debug!(connector = %self.inner.name(), attempt, "Empty response");
                    last_error = ConnectorError::EmptyResponse;
                }
                Err(e) => {
                    warn!(
                        connector = %self.inner.name(),
                        attempt,
                        attempts = self.attempts,
                        error = %e,
                        "Fetch failed"
                    );
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    fn name(&self) -> &str {
        "retry"
    }
}
