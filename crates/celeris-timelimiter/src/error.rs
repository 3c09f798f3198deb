use std::time::Duration;

use thiserror::Error;

/// Error returned when a time-limited run is force-cancelled.
///
/// The soft limit never produces an error by itself; it only flips the
/// cancellation token the handler is expected to poll. Only the hard limit
/// terminates the run.
#[derive(Debug, Error)]
pub enum TimeLimiterError {
    #[error("hard time limit of {limit:?} exceeded after {elapsed:?}")]
    HardLimitExceeded { limit: Duration, elapsed: Duration },
}
