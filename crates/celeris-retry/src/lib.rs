//! Retry decisions for task execution.
//!
//! Unlike a middleware-style retry wrapper, [`RetryConfig`] doesn't call
//! anything itself. The execution pipeline drives the loop (since a retry
//! here means re-publishing the task message to the broker after a delay,
//! not looping in-process) and asks [`RetryConfig::decide`] what to do after
//! each failed attempt.
//!
//! # Examples
//!
//! ```
//! use celeris_retry::{RetryConfig, RetryDecision};
//! use std::time::Duration;
//!
//! # #[derive(Debug, Clone)]
//! # struct TaskError;
//! let retry = RetryConfig::<TaskError>::builder()
//!     .exponential_backoff(Duration::from_millis(500))
//!     .name("tasks.send_email")
//!     .build();
//!
//! match retry.decide(0, 5, &TaskError) {
//!     RetryDecision::Retry { delay } => {
//!         // republish the message with eta = now + delay
//!     }
//!     RetryDecision::Exhausted => {
//!         // hand off to the dead-letter handler
//!     }
//!     _ => {}
//! }
//! ```

mod backoff;
mod budget;
mod config;
mod events;
mod policy;

pub use backoff::{ExponentialBackoff, FixedInterval, FnInterval, IntervalFunction};
pub use budget::{AimdBudget, RetryBudget, RetryBudgetBuilder, TokenBucketBudget};
pub use config::{RetryConfig, RetryConfigBuilder, RetryDecision};
pub use events::RetryEvent;
pub use policy::{RetryPolicy, RetryPredicate};
