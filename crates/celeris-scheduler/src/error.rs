//! Scheduler errors.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
    #[error("invalid cron expression {expression:?}: {message}")]
    InvalidCron { expression: String, message: String },

    #[error("no schedule entry named {name:?}")]
    UnknownEntry { name: String },
}
