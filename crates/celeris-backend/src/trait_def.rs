//! The abstract result-backend contract.

use async_trait::async_trait;
use celeris_core::{TaskResult, TaskState};
use std::time::Duration;
use uuid::Uuid;

use crate::error::BackendError;

/// Stores task outcomes and state, and lets callers await a result.
///
/// Any driver satisfying this contract (in-memory, Redis, Postgres) is an
/// acceptable [`Backend`]; only the in-memory reference driver
/// ([`crate::InMemoryBackend`]) ships in this crate.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Persists `result`, notifying any local waiter registered for
    /// `result.task_id`. `expiry`, if set, is how long the result remains
    /// fetchable before the backend may evict it.
    async fn store_result(
        &self,
        result: TaskResult,
        expiry: Option<Duration>,
    ) -> Result<(), BackendError>;

    async fn get_result(&self, task_id: Uuid) -> Result<Option<TaskResult>, BackendError>;

    /// Blocks until a result is stored for `task_id`, or `timeout` elapses.
    /// Tolerates the result arriving between the initial check and waiter
    /// registration, and always removes its waiter registration before
    /// returning, whatever the outcome.
    async fn wait_for_result(
        &self,
        task_id: Uuid,
        timeout: Option<Duration>,
    ) -> Result<TaskResult, BackendError>;

    async fn update_state(
        &self,
        task_id: Uuid,
        state: TaskState,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), BackendError>;

    async fn get_state(&self, task_id: Uuid) -> Result<Option<TaskState>, BackendError>;
}
