//! Closed error taxonomies shared across the celeris workspace.
//!
//! [`CeleriError`] covers construction- and validation-time failures inside
//! this crate (message building, state machine misuse). [`PipelineError`]
//! is the taxonomy that crosses the result backend boundary: every
//! component-specific error type in the workspace (`BrokerError`,
//! `RateLimiterError`, `TrackerError`, ...) converts into it via `From`, so
//! the execution pipeline never needs to downcast a `Box<dyn Error>` to
//! decide how to react to a failure.

use crate::state::TaskState;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while constructing or validating core types.
#[derive(Debug, Clone, Error)]
pub enum CeleriError {
    #[error("invalid task message: {reason}")]
    InvalidMessage { reason: String },

    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition { from: TaskState, to: TaskState },

    #[error("unsupported schema version {found} (max supported {max_supported})")]
    UnsupportedSchemaVersion { found: u16, max_supported: u16 },
}

/// The closed error taxonomy that crosses the result backend boundary.
///
/// Every variant carries enough information for the pipeline to decide its
/// next move (retry, dead-letter, drop) without inspecting a source chain.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// A transient failure that should be retried: broker/backend I/O
    /// hiccups, connection resets, timeouts below the hard limit.
    #[error("transient error in {source_component}: {message}")]
    Transient {
        source_component: String,
        message: String,
    },

    /// The task handler itself failed in a way that is not expected to
    /// succeed on retry (a bug, a malformed payload the handler rejected).
    #[error("permanent failure in task {task_name}: {message}")]
    PermanentFailure { task_name: String, message: String },

    /// The task was not executed this delivery and was requeued: rate
    /// limited, overlap-blocked, or partition-blocked. Carries the delay
    /// after which it becomes eligible again, if known.
    #[error("task requeued: {reason}")]
    Requeued {
        reason: RequeueReason,
        retry_after: Option<Duration>,
    },

    /// Execution was cancelled: a hard time limit fired or the task was
    /// revoked mid-flight.
    #[error("task cancelled: {reason}")]
    Cancelled { reason: CancelReason },

    /// The message failed validation or a security gate rejected it before
    /// the handler ever ran.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// An internal store (backend, delayed store, revocation store,
    /// dead-letter store) observed an inconsistency it could not repair.
    #[error("store inconsistency in {store}: {message}")]
    StoreInconsistency { store: String, message: String },
}

/// Why a task was requeued instead of executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequeueReason {
    RateLimited,
    OverlapBlocked,
    PartitionBlocked,
}

impl std::fmt::Display for RequeueReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequeueReason::RateLimited => "rate limited",
            RequeueReason::OverlapBlocked => "overlap blocked",
            RequeueReason::PartitionBlocked => "partition blocked",
        };
        write!(f, "{s}")
    }
}

/// Why execution was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    HardTimeLimit,
    Revoked,
    WorkerShutdown,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CancelReason::HardTimeLimit => "hard time limit exceeded",
            CancelReason::Revoked => "revoked",
            CancelReason::WorkerShutdown => "worker shutdown",
        };
        write!(f, "{s}")
    }
}

impl PipelineError {
    pub fn is_transient(&self) -> bool {
        matches!(self, PipelineError::Transient { .. })
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, PipelineError::PermanentFailure { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            PipelineError::Requeued { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn celeri_error_is_send_sync_static() {
        const fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<CeleriError>();
        assert_send_sync_static::<PipelineError>();
    }

    #[test]
    fn pipeline_error_roundtrips_through_json() {
        let err = PipelineError::Requeued {
            reason: RequeueReason::RateLimited,
            retry_after: Some(Duration::from_secs(5)),
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: PipelineError = serde_json::from_str(&json).unwrap();
        assert_eq!(err.retry_after(), back.retry_after());
    }

    #[test]
    fn helper_predicates() {
        let transient = PipelineError::Transient {
            source_component: "broker".to_string(),
            message: "connection reset".to_string(),
        };
        assert!(transient.is_transient());
        assert!(!transient.is_permanent());
    }
}
