//! Backoff interval strategies.
//!
//! [`ExponentialBackoff`] implements the formula
//! `delay = min(max_delay, initial_delay * multiplier ^ attempt)` with an
//! optional ±25% jitter applied multiplicatively, so concurrent retries of
//! the same task don't all wake up on the same tick.

use std::time::Duration;

use rand::Rng;

/// A pluggable backoff strategy: given the zero-indexed attempt number,
/// returns how long to wait before the next attempt.
pub trait IntervalFunction: Send + Sync {
    fn interval(&self, attempt: u32) -> Duration;
}

/// Always waits the same fixed duration.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
    delay: Duration,
}

impl FixedInterval {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl IntervalFunction for FixedInterval {
    fn interval(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// `delay = min(max_delay, initial_delay * multiplier ^ attempt)`, with an
/// optional ±25% multiplicative jitter.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    multiplier: f64,
    max_delay: Duration,
    jitter: bool,
}

impl ExponentialBackoff {
    /// Multiplier `2.0`, max delay capped at `initial_delay * 2^10`, jitter on.
    pub fn new(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            multiplier: 2.0,
            max_delay: initial_delay.saturating_mul(1024),
            jitter: true,
        }
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn interval(&self, attempt: u32) -> Duration {
        let raw = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = raw.min(self.max_delay.as_secs_f64());

        let jittered = if self.jitter {
            let factor = rand::rng().random_range(0.75..=1.25);
            capped * factor
        } else {
            capped
        };

        Duration::try_from_secs_f64(jittered.max(0.0)).unwrap_or(self.max_delay)
    }
}

/// A backoff strategy driven by an arbitrary closure.
pub struct FnInterval<F>
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    fn interval(&self, attempt: u32) -> Duration {
        (self.f)(attempt)
    }
}
