//! Named reference values shared across a run.
//!
//! A reference is resolved once (first resolution wins) and then read by
//! `{{{RefName=...}}}` tokens. The store is an explicit object carried in
//! the [`Context`](crate::Context), not process-global state.

use futures::future::join_all;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::connectors::build_connector;
use crate::context::Context;
use crate::engine::parse_response;
use crate::error::ConnectorError;
use crate::types::config::Reference;
use crate::value::Value;

/// Store of named values, each populated at most once.
#[derive(Debug, Default)]
pub struct RefStore {
    cells: Mutex<HashMap<String, Arc<OnceCell<Value>>>>,
}

impl RefStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<OnceCell<Value>>>> {
        self.cells.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cell(&self, name: &str) -> Arc<OnceCell<Value>> {
        Arc::clone(self.lock().entry(name.to_string()).or_default())
    }

    /// Return the value for `name`, running `populate` if it has none yet.
    ///
    /// Concurrent callers for the same name wait for the first population.
    /// A failed population leaves the name unset so a later call may retry.
    pub async fn get_or_populate<F, Fut, E>(&self, name: &str, populate: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        let cell = self.cell(name);
        cell.get_or_try_init(populate).await.cloned()
    }

    /// Set `name` unless it already has a value. Returns whether it was set.
    pub fn publish(&self, name: &str, value: Value) -> bool {
        self.cell(name).set(value).is_ok()
    }

    /// Read-only lookup.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.lock().get(name).and_then(|cell| cell.get().cloned())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Resolve every configured reference concurrently into the context's store.
///
/// References already present are left untouched. Failures are logged and
/// the reference stays unset.
pub async fn populate_references(context: &Context, references: &IndexMap<String, Reference>) {
    if references.is_empty() {
        return;
    }
    info!(count = references.len(), "Populating references");

    let tasks = references.iter().map(|(name, reference)| async move {
        let result = context
            .references()
            .get_or_populate(name, || async {
                let connector = build_connector(context, &reference.connector_config)?;
                let bytes = connector.fetch(None, None).await?;
                let value = parse_response(
                    context,
                    reference.connector_config.response_type,
                    &bytes,
                    &reference.model,
                )
                .await;
                Ok::<_, ConnectorError>(value)
            })
            .await;

        match result {
            Ok(value) => debug!(reference = %name, empty = value.is_empty(), "Reference ready"),
            Err(e) => warn!(reference = %name, error = %e, "Failed to populate reference"),
        }
    });

    join_all(tasks).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_first_population_wins() {
        let store = RefStore::new();
        let first = store
            .get_or_populate("k", || async { Ok::<_, ()>(Value::Int(1)) })
            .await
            .unwrap();
        let second = store
            .get_or_populate("k", || async { Ok::<_, ()>(Value::Int(2)) })
            .await
            .unwrap();

        assert_eq!(first, Value::Int(1));
        assert_eq!(second, Value::Int(1));
        assert!(!store.publish("k", Value::Int(3)));
        assert_eq!(store.get("k"), Some(Value::Int(1)));
    }

    #[tokio::test]
    async fn test_concurrent_callers_populate_once() {
        let store = Arc::new(RefStore::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks = (0..8).map(|i| {
            let store = Arc::clone(&store);
            let calls = Arc::clone(&calls);
            async move {
                store
                    .get_or_populate("shared", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        Ok::<_, ()>(Value::Int(i))
                    })
                    .await
                    .unwrap()
            }
        });
        let values = join_all(tasks).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(values.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[tokio::test]
    async fn test_failed_population_can_retry() {
        let store = RefStore::new();
        let failed = store
            .get_or_populate("k", || async { Err::<Value, _>("down") })
            .await;
        assert!(failed.is_err());
        assert!(!store.contains("k"));

        let value = store
            .get_or_populate("k", || async { Ok::<_, &str>(Value::Bool(true)) })
            .await
            .unwrap();
        assert_eq!(value, Value::Bool(true));
    }
}
