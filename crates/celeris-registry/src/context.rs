//! The context injected into every task handler invocation.

use std::collections::HashMap;

use celeris_core::{Progress, ProgressReporter};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Per-invocation handle a handler uses to report progress, read headers,
/// and notice cooperative cancellation (soft time limit, revocation).
#[derive(Clone)]
pub struct TaskContext {
    pub task_id: Uuid,
    pub task_name: String,
    pub retries: u32,
    pub headers: HashMap<String, String>,
    pub progress: ProgressReporter,
    pub cancellation: CancellationToken,
}

impl TaskContext {
    pub fn new(task_id: Uuid, task_name: impl Into<String>, retries: u32) -> Self {
        Self {
            task_id,
            task_name: task_name.into(),
            retries,
            headers: HashMap::new(),
            progress: ProgressReporter::new(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn progress_reporter(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Reports `items_processed/total_items` progress on this invocation's
    /// task id.
    pub fn report_progress(&self, items_processed: u64, total_items: u64) {
        self.progress.report(self.task_id, Progress::new(items_processed, total_items));
    }

    /// Reports progress with an attached status message and/or step name.
    pub fn report_progress_detailed(
        &self,
        items_processed: u64,
        total_items: u64,
        message: Option<&str>,
        current_step: Option<&str>,
    ) {
        let mut progress = Progress::new(items_processed, total_items);
        if let Some(message) = message {
            progress = progress.message(message);
        }
        if let Some(step) = current_step {
            progress = progress.current_step(step);
        }
        self.progress.report(self.task_id, progress);
    }

    /// Whether the handler has been asked to wind down cooperatively.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
