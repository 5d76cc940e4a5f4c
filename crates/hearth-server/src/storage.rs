//! Async access to the synchronous store.
//!
//! Every store call runs on tokio's blocking pool so a slow SQLite write
//! never parks a runtime worker that other connections are scheduled on.

use std::sync::Arc;

use hearth_store::Persistence;

use crate::error::ServerError;

#[derive(Clone)]
pub struct BlockingStore {
    inner: Arc<dyn Persistence>,
}

impl BlockingStore {
    pub fn new(inner: Arc<dyn Persistence>) -> Self {
        Self { inner }
    }

    /// Run one store operation off the async workers.
    pub async fn run<T, F>(&self, op: F) -> Result<T, ServerError>
    where
        F: FnOnce(&dyn Persistence) -> hearth_store::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.inner.clone();
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| ServerError::Internal(format!("Store task failed: {e}")))?
            .map_err(ServerError::from)
    }
}
