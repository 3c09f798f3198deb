use std::time::Duration;
use thiserror::Error;

/// Errors raised by the rate limiter.
#[derive(Debug, Clone, Error)]
pub enum RateLimiterError {
    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimitExceeded { retry_after: Duration },

    #[error("invalid rate limit spec string: {spec}")]
    InvalidPolicySpec { spec: String },
}
