//! Errors surfaced by the task registry and invoker.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("task {task_name} is not registered")]
    UnknownTask { task_name: String },

    #[error("task {task_name} is already registered")]
    DuplicateRegistration { task_name: String },

    #[error("failed to decode input for task {task_name}: {message}")]
    DecodeInput { task_name: String, message: String },

    #[error("failed to encode output for task {task_name}: {message}")]
    EncodeOutput { task_name: String, message: String },

    #[error("handler for task {task_name} failed: {message}")]
    HandlerFailed { task_name: String, message: String },
}
