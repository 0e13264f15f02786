//! Per-provider request serialization.
//!
//! An upstream web session tolerates only one in-flight conversation, so
//! relay cycles for the same provider run strictly one after another in
//! arrival order. Different providers never wait on each other.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::providers::RelayError;
use crate::runtime::{ProviderRuntime, RuntimeState};

pub struct RequestSerializer {
    runtime: Arc<ProviderRuntime>,
    cycle_timeout: Option<Duration>,
}

impl RequestSerializer {
    pub fn new(runtime: Arc<ProviderRuntime>, cycle_timeout: Option<Duration>) -> Self {
        Self {
            runtime,
            cycle_timeout,
        }
    }

    /// Run `task` while holding the provider's lock.
    ///
    /// Waiters are served FIFO. The lock is released when the task finishes,
    /// fails, or exceeds the cycle timeout; a timed-out task is dropped.
    pub async fn with_lock<F, Fut, T>(&self, provider: &str, task: F) -> Result<T, RelayError>
    where
        F: FnOnce(Arc<RuntimeState>) -> Fut,
        Fut: Future<Output = Result<T, RelayError>>,
    {
        let state = self
            .runtime
            .get(provider)
            .ok_or_else(|| RelayError::NotActive(provider.to_string()))?;

        let _guard = state.lock.lock().await;
        debug!("Acquired relay lock for '{}'", provider);

        let cycle = task(Arc::clone(&state));
        match self.cycle_timeout {
            Some(limit) => match tokio::time::timeout(limit, cycle).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Relay cycle for '{}' timed out after {:?}", provider, limit);
                    Err(RelayError::Timeout(limit))
                }
            },
            None => cycle.await,
        }
    }
}
