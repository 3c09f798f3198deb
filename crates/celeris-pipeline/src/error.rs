//! Errors raised by the pipeline's own pre-dispatch checks, as opposed to
//! [`celeris_core::PipelineError`], which covers everything that can happen
//! once a message has passed those checks and entered execution.

use thiserror::Error;

/// Failures from [`crate::security::SecurityGate`]. All of these are
/// terminal: a message that trips one of these checks is dead-lettered,
/// never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecurityError {
    #[error("schema version {found} exceeds max supported {max_supported}")]
    UnsupportedSchemaVersion { found: u16, max_supported: u16 },

    #[error("payload of {size} bytes exceeds cap of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("task {task_name} is not in the configured allowlist")]
    TaskNotAllowed { task_name: String },

    #[error("signature required but missing")]
    MissingSignature,

    #[error("signature verification failed")]
    InvalidSignature,
}
