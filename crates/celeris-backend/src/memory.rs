//! An in-memory [`Backend`] sufficient for tests and single-process use.

use std::time::Duration;

use async_trait::async_trait;
use celeris_core::{TaskResult, TaskState};
use dashmap::DashMap;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::BackendError;
use crate::trait_def::Backend;

/// In-process reference backend. Results live forever (`expiry` is
/// accepted but not enforced, since nothing here sweeps on a timer without
/// an owning task); a real driver would set a TTL at the storage layer.
///
/// Each `wait_for_result` registration gets its own id so it can be removed
/// from the waiter bucket on every exit path (success, timeout, or the
/// channel closing), never leaking an entry.
#[derive(Default)]
pub struct InMemoryBackend {
    results: DashMap<Uuid, TaskResult>,
    states: DashMap<Uuid, TaskState>,
    waiters: DashMap<Uuid, DashMap<Uuid, oneshot::Sender<TaskResult>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn store_result(
        &self,
        result: TaskResult,
        _expiry: Option<Duration>,
    ) -> Result<(), BackendError> {
        let task_id = result.task_id;
        self.states.insert(task_id, result.state);
        self.results.insert(task_id, result.clone());

        if let Some((_, bucket)) = self.waiters.remove(&task_id) {
            for (_, sender) in bucket {
                let _ = sender.send(result.clone());
            }
        }
        Ok(())
    }

    async fn get_result(&self, task_id: Uuid) -> Result<Option<TaskResult>, BackendError> {
        Ok(self.results.get(&task_id).map(|entry| entry.clone()))
    }

    async fn wait_for_result(
        &self,
        task_id: Uuid,
        timeout: Option<Duration>,
    ) -> Result<TaskResult, BackendError> {
        if let Some(result) = self.get_result(task_id).await? {
            return Ok(result);
        }

        let registration_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.waiters
            .entry(task_id)
            .or_default()
            .insert(registration_id, tx);

        // Re-check after registering: the result may have arrived between
        // the first check and the waiter's insertion above.
        if let Some(result) = self.get_result(task_id).await? {
            self.remove_waiter(task_id, registration_id);
            return Ok(result);
        }

        let outcome = match timeout {
            Some(duration) => tokio::time::timeout(duration, rx)
                .await
                .map_err(|_| BackendError::Timeout {
                    task_id,
                    timeout_secs: duration.as_secs_f64(),
                }),
            None => Ok(rx.await),
        };
        self.remove_waiter(task_id, registration_id);

        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) => self
                .get_result(task_id)
                .await?
                .ok_or(BackendError::Unavailable {
                    message: "waiter channel closed without a result".to_string(),
                }),
            Err(timeout_err) => Err(timeout_err),
        }
    }

    async fn update_state(
        &self,
        task_id: Uuid,
        state: TaskState,
        _metadata: Option<serde_json::Value>,
    ) -> Result<(), BackendError> {
        let mut entry = self.states.entry(task_id).or_insert(state);
        if entry.is_terminal() && *entry != state {
            // refuse to overwrite a terminal state with a non-terminal one
            return Ok(());
        }
        *entry = state;
        Ok(())
    }

    async fn get_state(&self, task_id: Uuid) -> Result<Option<TaskState>, BackendError> {
        Ok(self.states.get(&task_id).map(|entry| *entry))
    }
}

impl InMemoryBackend {
    fn remove_waiter(&self, task_id: Uuid, registration_id: Uuid) {
        if let Some(bucket) = self.waiters.get(&task_id) {
            bucket.remove(&registration_id);
        }
    }
}
