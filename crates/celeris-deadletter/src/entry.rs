//! The dead-lettered record and why it was placed there.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Why a message was moved to the dead-letter store. Each variant
/// corresponds to a terminal outcome in the execution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadLetterReason {
    /// Failed validation, decode, or security checks.
    Rejected,
    /// The message's `expires` deadline had already passed.
    Expired,
    /// No registration exists for the message's task name.
    UnknownTask,
    /// The handler raised and the retry budget was exhausted.
    MaxRetriesExceeded,
}

/// Detail about the exception that produced the failure, when one exists
/// (a `Rejected`/`Expired`/`UnknownTask` entry has none).
#[derive(Debug, Clone, Default)]
pub struct ExceptionInfo {
    pub exception_type: Option<String>,
    pub exception_message: Option<String>,
    pub exception_stack: Option<String>,
}

/// A terminally-undeliverable message, held for operator triage.
#[derive(Debug, Clone)]
pub struct DeadLetterEntry {
    pub id: Uuid,
    pub task_id: Uuid,
    pub task_name: String,
    pub queue: String,
    pub original_payload: Vec<u8>,
    pub reason: DeadLetterReason,
    pub exception: ExceptionInfo,
    pub timestamp: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl DeadLetterEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| now >= expiry)
    }
}
