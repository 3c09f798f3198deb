//! Errors surfaced by [`crate::DelayedStore`] implementations.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DelayedError {
    #[error("delayed store unavailable: {message}")]
    Unavailable { message: String },
}
