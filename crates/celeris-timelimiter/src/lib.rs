//! Soft and hard time limits for running task handlers.
//!
//! A soft limit is signal-only: when it elapses, a [`CancellationToken`] the
//! caller supplied is cancelled so a cooperative handler can notice and wind
//! down on its own terms, but the handler keeps running. A hard limit is
//! enforced unconditionally: when it elapses the handler future is dropped
//! and [`TimeLimiterError::HardLimitExceeded`] is returned.
//!
//! # Examples
//!
//! ```
//! use celeris_timelimiter::TimeLimiter;
//! use tokio_util::sync::CancellationToken;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let limiter = TimeLimiter::builder()
//!     .soft_limit(Duration::from_secs(5))
//!     .hard_limit(Duration::from_secs(10))
//!     .name("tasks.render_report")
//!     .build();
//!
//! let token = CancellationToken::new();
//! let result = limiter.run(token.clone(), async {
//!     // handler body; may poll token.is_cancelled() to wind down early
//!     42
//! }).await;
//! # }
//! ```

use std::future::Future;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

mod config;
mod error;
mod events;

pub use config::{TimeLimitPolicy, TimeLimiterConfig, TimeLimiterConfigBuilder};
pub use error::TimeLimiterError;
pub use events::TimeLimiterEvent;

/// Enforces a [`TimeLimitPolicy`] around an arbitrary future.
pub struct TimeLimiter {
    config: TimeLimiterConfig,
}

impl TimeLimiter {
    pub fn builder() -> TimeLimiterConfigBuilder {
        TimeLimiterConfigBuilder::new()
    }

    pub(crate) fn from_config(config: TimeLimiterConfig) -> Self {
        Self { config }
    }

    pub fn policy(&self) -> &TimeLimitPolicy {
        &self.config.policy
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Runs `fut`, cancelling `soft_token` when the soft limit elapses and
    /// force-dropping `fut` when the hard limit elapses.
    pub async fn run<F, T>(
        &self,
        soft_token: CancellationToken,
        fut: F,
    ) -> Result<T, TimeLimiterError>
    where
        F: Future<Output = T> + Send,
    {
        let start = Instant::now();
        let name = self.config.name.clone();
        let listeners = self.config.event_listeners.clone();

        // The soft watcher runs detached: it only flips `soft_token` and emits
        // an event, never touches `fut`. It's aborted once the run finishes
        // so a late-firing soft limit can't leak a cancellation signal into
        // whatever reuses the token next.
        let soft_handle = self.config.policy.soft_limit.map(|limit| {
            let token = soft_token.clone();
            let listeners = listeners.clone();
            let name = name.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                token.cancel();
                listeners.emit(&TimeLimiterEvent::SoftLimitReached {
                    pattern_name: name,
                    timestamp: Instant::now(),
                    elapsed: limit,
                });
            })
        });

        let outcome = match self.config.policy.hard_limit {
            Some(hard) => tokio::time::timeout(hard, fut).await.map_err(|_| hard),
            None => Ok(fut.await),
        };

        if let Some(handle) = soft_handle {
            handle.abort();
        }

        match outcome {
            Ok(value) => {
                listeners.emit(&TimeLimiterEvent::Completed {
                    pattern_name: name,
                    timestamp: Instant::now(),
                    duration: start.elapsed(),
                });
                Ok(value)
            }
            Err(hard_limit) => {
                let elapsed = start.elapsed();
                listeners.emit(&TimeLimiterEvent::HardLimitReached {
                    pattern_name: name,
                    timestamp: Instant::now(),
                    elapsed,
                });
                Err(TimeLimiterError::HardLimitExceeded {
                    limit: hard_limit,
                    elapsed,
                })
            }
        }
    }
}
