//! Request limiting for network connectors.
//!
//! A [`ResourceLimiter`] caps in-flight requests with a semaphore and can
//! additionally enforce a per-host quota using the governor crate. It is
//! passed to connectors through the [`Context`](crate::Context).

use governor::{Quota, RateLimiter};
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{ConnectorError, ConnectorResult};

type HostRateLimiter = RateLimiter<
    String,
    governor::state::keyed::DefaultKeyedStateStore<String>,
    governor::clock::DefaultClock,
>;

/// Concurrency cap plus optional per-host rate limit.
pub struct ResourceLimiter {
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    hosts: Option<HostRateLimiter>,
}

impl Default for ResourceLimiter {
    fn default() -> Self {
        Self::new(16)
    }
}

impl ResourceLimiter {
    /// Allow at most `max_concurrent` requests in flight (at least one).
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            hosts: None,
        }
    }

    /// Limit each host to `requests_per_second`; zero disables the quota.
    pub fn with_requests_per_second(self, requests_per_second: u32) -> Self {
        match NonZeroU32::new(requests_per_second) {
            Some(rps) => self.with_quota(Quota::per_second(rps)),
            None => self,
        }
    }

    /// Limit each host with a custom quota.
    pub fn with_quota(mut self, quota: Quota) -> Self {
        self.hosts = Some(RateLimiter::keyed(quota));
        self
    }

    /// Wait for the host's quota and a free slot.
    ///
    /// The slot is released when the returned permit is dropped.
    pub async fn acquire(&self, host: &str) -> ConnectorResult<OwnedSemaphorePermit> {
        if let Some(hosts) = &self.hosts {
            hosts.until_key_ready(&host.to_string()).await;
        }
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ConnectorError::Unavailable("request limiter closed".to_string()))
    }

    /// Free request slots right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl fmt::Debug for ResourceLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLimiter")
            .field("max_concurrent", &self.max_concurrent)
            .field("available", &self.available())
            .field("per_host_quota", &self.hosts.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_permits_are_released_on_drop() {
        let limiter = ResourceLimiter::new(2);
        let a = limiter.acquire("a.example").await.unwrap();
        let _b = limiter.acquire("b.example").await.unwrap();
        assert_eq!(limiter.available(), 0);

        drop(a);
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_allows_one() {
        let limiter = ResourceLimiter::new(0);
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn test_per_host_rate_limit() {
        let limiter = ResourceLimiter::new(8).with_requests_per_second(2);

        let start = Instant::now();
        for _ in 0..3 {
            let _permit = limiter.acquire("slow.example").await.unwrap();
        }
        // First is immediate, the third waits for the quota to refill
        assert!(start.elapsed().as_millis() >= 400, "rate limit not applied: {:?}", start.elapsed());

        // Other hosts have their own budget
        let start = Instant::now();
        let _permit = limiter.acquire("fast.example").await.unwrap();
        assert!(start.elapsed().as_millis() < 100);
    }
}
