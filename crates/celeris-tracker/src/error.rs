//! Error types for the execution tracker.

/// Errors surfaced by tracker configuration. `try_start`/`stop`/`extend`
/// themselves report outcomes as plain booleans per their contract, not via
/// this type.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TrackerError {
    #[error("lease duration must be greater than zero")]
    InvalidLeaseDuration,
}
