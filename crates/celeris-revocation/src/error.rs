//! Errors surfaced by [`crate::RevocationStore`] implementations.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RevocationError {
    #[error("revocation store unavailable: {message}")]
    Unavailable { message: String },
}
