//! Rate limit policies: the algorithm and window a resource key is
//! checked against, plus parsing of the spec mini-language (`"10/s"`,
//! `"100/m"`, `"1000/h"`).

use std::time::Duration;

use crate::error::RateLimiterError;

/// Which algorithm a [`RateLimitPolicy`] is enforced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitAlgorithm {
    /// Counts requests in non-overlapping windows of `window` length,
    /// resetting to zero at each boundary. Cheapest, but allows up to
    /// `2 * limit` requests across a boundary.
    FixedWindow,
    /// Tracks individual request timestamps over a rolling `window`.
    /// Exact, at the cost of O(limit) memory per key.
    SlidingWindow,
    /// Tokens refill continuously at `limit / window` per unit time up to
    /// a burst capacity of `limit`. Smooths bursts at window boundaries.
    TokenBucket,
}

/// A rate limit: `limit` permits per `window`, checked with `algorithm`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub limit: u64,
    pub window: Duration,
    pub algorithm: RateLimitAlgorithm,
}

impl RateLimitPolicy {
    pub fn fixed_window(limit: u64, window: Duration) -> Self {
        Self {
            limit,
            window,
            algorithm: RateLimitAlgorithm::FixedWindow,
        }
    }

    pub fn sliding_window(limit: u64, window: Duration) -> Self {
        Self {
            limit,
            window,
            algorithm: RateLimitAlgorithm::SlidingWindow,
        }
    }

    pub fn token_bucket(limit: u64, window: Duration) -> Self {
        Self {
            limit,
            window,
            algorithm: RateLimitAlgorithm::TokenBucket,
        }
    }

    /// Parses a spec string of the form `"<limit>/<unit>"` where `<unit>`
    /// is one of `s`, `m`, `h` (second, minute, hour). The algorithm
    /// defaults to [`RateLimitAlgorithm::FixedWindow`]; use
    /// [`RateLimitPolicy::with_algorithm`] to change it after parsing.
    pub fn parse(spec: &str) -> Result<Self, RateLimiterError> {
        let (count_str, unit) = spec.split_once('/').ok_or_else(|| {
            RateLimiterError::InvalidPolicySpec {
                spec: spec.to_string(),
            }
        })?;

        let limit: u64 = count_str
            .trim()
            .parse()
            .map_err(|_| RateLimiterError::InvalidPolicySpec {
                spec: spec.to_string(),
            })?;

        let window = match unit.trim().to_lowercase().as_str() {
            "s" => Duration::from_secs(1),
            "m" => Duration::from_secs(60),
            "h" => Duration::from_secs(3600),
            "d" => Duration::from_secs(86_400),
            _ => {
                return Err(RateLimiterError::InvalidPolicySpec {
                    spec: spec.to_string(),
                })
            }
        };

        Ok(Self::fixed_window(limit, window))
    }

    pub fn with_algorithm(mut self, algorithm: RateLimitAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}
