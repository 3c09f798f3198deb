//! The rate limiter: a keyed map of per-(resource, policy) bucket state,
//! dispatching to the fixed-window, sliding-window, or token-bucket
//! algorithm named by the policy.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use celeris_core::{EventListener, EventListeners};

use crate::config::{RateLimitAlgorithm, RateLimitPolicy};
use crate::events::RateLimiterEvent;

/// The outcome of a [`RateLimiter::try_acquire`] call.
#[derive(Debug, Clone, Copy)]
pub struct Lease {
    pub acquired: bool,
    pub retry_after: Option<std::time::Duration>,
    pub remaining: u64,
}

#[derive(Debug)]
struct FixedWindowState {
    window_start: DateTime<Utc>,
    count: u64,
}

#[derive(Debug)]
struct SlidingWindowState {
    timestamps: VecDeque<DateTime<Utc>>,
}

#[derive(Debug)]
struct TokenBucketState {
    tokens: f64,
    last_refill: DateTime<Utc>,
}

#[derive(Debug)]
enum AlgoState {
    Fixed(FixedWindowState),
    Sliding(SlidingWindowState),
    TokenBucket(TokenBucketState),
}

impl AlgoState {
    fn new(algorithm: RateLimitAlgorithm, now: DateTime<Utc>, limit: u64) -> Self {
        match algorithm {
            RateLimitAlgorithm::FixedWindow => AlgoState::Fixed(FixedWindowState {
                window_start: now,
                count: 0,
            }),
            RateLimitAlgorithm::SlidingWindow => AlgoState::Sliding(SlidingWindowState {
                timestamps: VecDeque::new(),
            }),
            RateLimitAlgorithm::TokenBucket => AlgoState::TokenBucket(TokenBucketState {
                tokens: limit as f64,
                last_refill: now,
            }),
        }
    }
}

fn try_acquire_locked(state: &mut AlgoState, policy: &RateLimitPolicy, now: DateTime<Utc>) -> Lease {
    let window =
        chrono::Duration::from_std(policy.window).unwrap_or(chrono::Duration::seconds(1));

    match state {
        AlgoState::Fixed(fixed) => {
            if now - fixed.window_start >= window {
                fixed.window_start = now;
                fixed.count = 0;
            }
            if fixed.count < policy.limit {
                fixed.count += 1;
                Lease {
                    acquired: true,
                    retry_after: None,
                    remaining: policy.limit - fixed.count,
                }
            } else {
                let elapsed = now - fixed.window_start;
                let retry_after = (window - elapsed).to_std().unwrap_or(policy.window);
                Lease {
                    acquired: false,
                    retry_after: Some(retry_after),
                    remaining: 0,
                }
            }
        }
        AlgoState::Sliding(sliding) => {
            let cutoff = now - window;
            while sliding.timestamps.front().is_some_and(|ts| *ts <= cutoff) {
                sliding.timestamps.pop_front();
            }
            if (sliding.timestamps.len() as u64) < policy.limit {
                sliding.timestamps.push_back(now);
                Lease {
                    acquired: true,
                    retry_after: None,
                    remaining: policy.limit - sliding.timestamps.len() as u64,
                }
            } else {
                let oldest = *sliding.timestamps.front().unwrap();
                let retry_after = (oldest + window - now).to_std().unwrap_or(policy.window);
                Lease {
                    acquired: false,
                    retry_after: Some(retry_after),
                    remaining: 0,
                }
            }
        }
        AlgoState::TokenBucket(bucket) => {
            let elapsed = (now - bucket.last_refill).to_std().unwrap_or_default();
            let refill_rate = policy.limit as f64 / policy.window.as_secs_f64().max(f64::EPSILON);
            bucket.tokens =
                (bucket.tokens + elapsed.as_secs_f64() * refill_rate).min(policy.limit as f64);
            bucket.last_refill = now;

            if bucket.tokens >= 1.0 {
                bucket.tokens -= 1.0;
                Lease {
                    acquired: true,
                    retry_after: None,
                    remaining: bucket.tokens as u64,
                }
            } else {
                let deficit = 1.0 - bucket.tokens;
                let retry_after = std::time::Duration::from_secs_f64(deficit / refill_rate);
                Lease {
                    acquired: false,
                    retry_after: Some(retry_after),
                    remaining: 0,
                }
            }
        }
    }
}

type BucketKey = (String, u64, u64, u8);

impl RateLimitAlgorithm {
    fn as_u8(self) -> u8 {
        match self {
            RateLimitAlgorithm::FixedWindow => 0,
            RateLimitAlgorithm::SlidingWindow => 1,
            RateLimitAlgorithm::TokenBucket => 2,
        }
    }
}

/// A shared, keyed rate limiter covering all three algorithms named in the
/// policy. One bucket is created per distinct `(resource_key, policy)`
/// combination; changing a policy's shape starts a fresh bucket rather
/// than reinterpreting old state.
#[derive(Default)]
pub struct RateLimiter {
    buckets: DashMap<BucketKey, Mutex<AlgoState>>,
    event_listeners: EventListeners<RateLimiterEvent>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: EventListener<RateLimiterEvent> + 'static,
    {
        self.event_listeners.add(listener);
    }

    /// Attempts to acquire one permit for `resource_key` under `policy`,
    /// using `now` as the current time so callers can drive this with an
    /// injected clock in tests.
    pub fn try_acquire_at(
        &self,
        resource_key: &str,
        policy: &RateLimitPolicy,
        now: DateTime<Utc>,
    ) -> Lease {
        let key: BucketKey = (
            resource_key.to_string(),
            policy.limit,
            policy.window.as_millis() as u64,
            policy.algorithm.as_u8(),
        );

        let entry = self
            .buckets
            .entry(key)
            .or_insert_with(|| Mutex::new(AlgoState::new(policy.algorithm, now, policy.limit)));

        let mut state = entry.lock().unwrap();
        let lease = try_acquire_locked(&mut state, policy, now);
        drop(state);

        if lease.acquired {
            self.event_listeners.emit(&RateLimiterEvent::PermitAcquired {
                resource_key: resource_key.to_string(),
                remaining: lease.remaining,
                timestamp: Instant::now(),
            });
        } else if let Some(retry_after) = lease.retry_after {
            self.event_listeners.emit(&RateLimiterEvent::PermitRejected {
                resource_key: resource_key.to_string(),
                retry_after,
                timestamp: Instant::now(),
            });
        }

        lease
    }

    /// Convenience wrapper over [`RateLimiter::try_acquire_at`] using the
    /// wall clock.
    pub async fn try_acquire(&self, resource_key: &str, policy: &RateLimitPolicy) -> Lease {
        self.try_acquire_at(resource_key, policy, Utc::now())
    }
}
