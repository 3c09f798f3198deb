//! Errors surfaced by [`crate::Backend`] implementations.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("waiting for result of task {task_id} timed out after {timeout_secs}s")]
    Timeout { task_id: Uuid, timeout_secs: f64 },

    #[error("backend unavailable: {message}")]
    Unavailable { message: String },
}
