//! The task state machine shared by the result backend and the pipeline's
//! in-flight bookkeeping, so "is this state terminal" can never drift
//! between the two copies.

use serde::{Deserialize, Serialize};

use crate::error::CeleriError;

/// Lifecycle state of a task, as reported through the result backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    Pending,
    Received,
    Started,
    Success,
    Failure,
    Revoked,
    Rejected,
    Retry,
    Progress,
    Requeued,
}

impl TaskState {
    /// States from which no further transition is valid.
    pub const TERMINAL: &'static [TaskState] =
        &[TaskState::Success, TaskState::Failure, TaskState::Revoked, TaskState::Rejected];

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }
}

/// Validates a transition in the task state machine.
///
/// Same-state transitions are idempotent no-ops (allowed, and required for
/// `Progress → Progress` self-loops). Any transition out of a terminal
/// state, other than to itself, is rejected.
pub fn validate_transition(from: TaskState, to: TaskState) -> Result<(), CeleriError> {
    use TaskState::*;

    if from == to {
        return Ok(());
    }

    if from.is_terminal() {
        return Err(CeleriError::InvalidStateTransition { from, to });
    }

    let allowed = matches!(
        (from, to),
        (Pending, Received)
            | (Pending, Revoked)
            | (Received, Started)
            | (Received, Revoked)
            | (Started, Success)
            | (Started, Failure)
            | (Started, Retry)
            | (Started, Revoked)
            | (Started, Rejected)
            | (Started, Requeued)
            | (Started, Progress)
            | (Retry, Received)
            | (Retry, Failure)
            | (Retry, Revoked)
            | (Retry, Rejected)
            | (Requeued, Received)
            | (Requeued, Revoked)
            | (Progress, Success)
            | (Progress, Failure)
            | (Progress, Revoked)
            | (Progress, Rejected)
    );

    if allowed {
        Ok(())
    } else {
        Err(CeleriError::InvalidStateTransition { from, to })
    }
}
