//! Errors surfaced by [`crate::DeadLetterStore`] implementations.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
pub enum DeadLetterError {
    #[error("no dead-lettered entry {id}")]
    NotFound { id: Uuid },

    #[error("dead-letter store unavailable: {message}")]
    Unavailable { message: String },
}
