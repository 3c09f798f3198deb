//! The task result record stored in the backend and returned to waiters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::state::TaskState;

/// A snapshot of a task's outcome, as persisted by a result backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: Uuid,
    pub state: TaskState,
    pub value: Option<serde_json::Value>,
    pub error: Option<PipelineError>,
    pub progress: Option<Progress>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub retries: u32,
}

impl TaskResult {
    pub fn pending(task_id: Uuid) -> Self {
        Self {
            task_id,
            state: TaskState::Pending,
            value: None,
            error: None,
            progress: None,
            started_at: None,
            finished_at: None,
            retries: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// A progress update reported by a running task handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub percentage: u8,
    pub message: Option<String>,
    pub items_processed: u64,
    pub total_items: u64,
    pub current_step: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Progress {
    /// Builds a progress value from an item count, clamping `items_processed`
    /// into `[0, total_items]` and deriving `percentage` from the ratio. A
    /// `total_items` of zero is treated as already complete.
    pub fn new(items_processed: u64, total_items: u64) -> Self {
        let clamped = if total_items == 0 {
            items_processed
        } else {
            items_processed.min(total_items)
        };
        let percentage = if total_items == 0 {
            100
        } else {
            ((clamped as u128 * 100) / total_items as u128) as u8
        };
        Self {
            percentage,
            message: None,
            items_processed: clamped,
            total_items,
            current_step: None,
            timestamp: Utc::now(),
        }
    }

    /// Attaches a human-readable status message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches the name of the step currently executing.
    pub fn current_step(mut self, step: impl Into<String>) -> Self {
        self.current_step = Some(step.into());
        self
    }

    /// Percentage in `[0, 100]`.
    pub fn percent(&self) -> u8 {
        self.percentage
    }
}
