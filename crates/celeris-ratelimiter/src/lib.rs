//! Keyed rate limiting for task execution.
//!
//! Each task registration can carry a [`RateLimitPolicy`] (parsed from a
//! spec string like `"10/m"` or built directly) enforced per resource key,
//! typically the task name, but any string the pipeline derives from the
//! message works. Three algorithms are supported: fixed window, sliding
//! window, and token bucket.
//!
//! # Examples
//!
//! ```
//! use celeris_ratelimiter::{RateLimiter, RateLimitPolicy};
//!
//! # async fn example() {
//! let limiter = RateLimiter::new();
//! let policy = RateLimitPolicy::parse("10/s").unwrap();
//!
//! let lease = limiter.try_acquire("tasks.send_email", &policy).await;
//! if lease.acquired {
//!     // proceed with the call
//! } else {
//!     // requeue with lease.retry_after
//! }
//! # }
//! ```

mod config;
mod error;
mod events;
mod limiter;

pub use config::{RateLimitAlgorithm, RateLimitPolicy};
pub use error::RateLimiterError;
pub use events::RateLimiterEvent;
pub use limiter::{Lease, RateLimiter};
