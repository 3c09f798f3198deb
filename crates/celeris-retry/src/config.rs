use std::sync::Arc;
use std::time::{Duration, Instant};

use celeris_core::events::{EventListeners, FnListener};

use crate::backoff::{ExponentialBackoff, FixedInterval, IntervalFunction};
use crate::budget::RetryBudget;
use crate::events::RetryEvent;
use crate::policy::{RetryPolicy, RetryPredicate};

/// Outcome of asking a [`RetryConfig`] whether a failed attempt should be retried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryDecision {
    /// Retry after waiting `delay`.
    Retry { delay: Duration },
    /// The error is not eligible for retry per the configured predicate.
    NotRetryable,
    /// `attempt` has reached `max_attempts`.
    Exhausted,
    /// A retry would otherwise happen but the retry budget has no tokens left.
    BudgetExhausted,
}

/// Ties a backoff/predicate policy to an optional shared retry budget and
/// reports outcomes through an event stream.
pub struct RetryConfig<E> {
    policy: RetryPolicy<E>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
    budget: Option<Arc<dyn RetryBudget>>,
}

impl<E> RetryConfig<E> {
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::new()
    }

    /// Decides what to do with a failed attempt.
    ///
    /// `attempt` is the zero-indexed attempt that just failed (0 = the
    /// initial attempt). Emits a [`RetryEvent`] for whichever outcome is
    /// returned.
    pub fn decide(&self, attempt: u32, max_attempts: u32, error: &E) -> RetryDecision {
        let now = Instant::now();

        if !self.policy.should_retry(error) {
            self.event_listeners.emit(&RetryEvent::IgnoredError {
                pattern_name: self.name.clone(),
                timestamp: now,
            });
            return RetryDecision::NotRetryable;
        }

        if attempt + 1 >= max_attempts {
            self.event_listeners.emit(&RetryEvent::Exhausted {
                pattern_name: self.name.clone(),
                timestamp: now,
                attempts: attempt + 1,
            });
            return RetryDecision::Exhausted;
        }

        if let Some(budget) = &self.budget {
            if !budget.try_withdraw() {
                self.event_listeners.emit(&RetryEvent::BudgetExhausted {
                    pattern_name: self.name.clone(),
                    timestamp: now,
                    attempt,
                });
                return RetryDecision::BudgetExhausted;
            }
        }

        let delay = self.policy.next_backoff(attempt);
        self.event_listeners.emit(&RetryEvent::Retry {
            pattern_name: self.name.clone(),
            timestamp: now,
            attempt: attempt + 1,
            delay,
        });
        RetryDecision::Retry { delay }
    }

    /// Records a successful outcome after `attempts` total tries, depositing
    /// back into the retry budget if one is configured.
    pub fn record_success(&self, attempts: u32) {
        if let Some(budget) = &self.budget {
            budget.deposit();
        }
        self.event_listeners.emit(&RetryEvent::Success {
            pattern_name: self.name.clone(),
            timestamp: Instant::now(),
            attempts,
        });
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<E> {
    interval_fn: Option<Arc<dyn IntervalFunction>>,
    retry_predicate: Option<RetryPredicate<E>>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
    budget: Option<Arc<dyn RetryBudget>>,
}

impl<E> Default for RetryConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RetryConfigBuilder<E> {
    /// Defaults: exponential backoff from 100ms, no predicate (retry
    /// everything), no budget, name `"<unnamed>"`.
    pub fn new() -> Self {
        Self {
            interval_fn: None,
            retry_predicate: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
            budget: None,
        }
    }

    pub fn fixed_backoff(mut self, duration: Duration) -> Self {
        self.interval_fn = Some(Arc::new(FixedInterval::new(duration)));
        self
    }

    pub fn exponential_backoff(mut self, initial_interval: Duration) -> Self {
        self.interval_fn = Some(Arc::new(ExponentialBackoff::new(initial_interval)));
        self
    }

    pub fn backoff<I>(mut self, interval_fn: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        self.interval_fn = Some(Arc::new(interval_fn));
        self
    }

    /// Sets a predicate to determine which errors should be retried. Errors
    /// for which the predicate returns `false` surface immediately as
    /// [`RetryDecision::NotRetryable`].
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Sets a retry budget shared across all tasks retried through this
    /// config, to keep a burst of failures from flooding the broker with
    /// retry republishes.
    pub fn budget(mut self, budget: Arc<dyn RetryBudget>) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    pub fn on_ignored_error<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, RetryEvent::IgnoredError { .. }) {
                f();
            }
        }));
        self
    }

    pub fn on_budget_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::BudgetExhausted { attempt, .. } = event {
                f(*attempt);
            }
        }));
        self
    }

    pub fn build(self) -> RetryConfig<E> {
        let interval_fn = self
            .interval_fn
            .unwrap_or_else(|| Arc::new(ExponentialBackoff::new(Duration::from_millis(100))));

        let mut policy = RetryPolicy::new(interval_fn);
        if let Some(predicate) = self.retry_predicate {
            policy = policy.with_predicate(predicate);
        }

        RetryConfig {
            policy,
            event_listeners: self.event_listeners,
            name: self.name,
            budget: self.budget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_retry_everything_exponentially() {
        let config = RetryConfig::<&str>::builder().build();
        match config.decide(0, 3, &"boom") {
            RetryDecision::Retry { delay } => assert!(delay > Duration::ZERO),
            other => panic!("expected retry, got {other:?}"),
        }
    }

    #[test]
    fn exhausts_once_max_attempts_reached() {
        let config = RetryConfig::<&str>::builder()
            .fixed_backoff(Duration::from_millis(10))
            .build();
        assert_eq!(config.decide(2, 3, &"boom"), RetryDecision::Exhausted);
    }

    #[test]
    fn predicate_blocks_non_retryable_errors() {
        let config = RetryConfig::<&str>::builder()
            .fixed_backoff(Duration::from_millis(10))
            .retry_on(|e: &&str| *e != "fatal")
            .build();
        assert_eq!(config.decide(0, 5, &"fatal"), RetryDecision::NotRetryable);
        assert_eq!(
            config.decide(0, 5, &"transient"),
            RetryDecision::Retry {
                delay: Duration::from_millis(10)
            }
        );
    }

    #[test]
    fn budget_exhaustion_blocks_retry() {
        use crate::budget::RetryBudgetBuilder;
        let budget = RetryBudgetBuilder::new()
            .token_bucket()
            .max_tokens(0)
            .initial_tokens(0)
            .build();
        let config = RetryConfig::<&str>::builder()
            .fixed_backoff(Duration::from_millis(10))
            .budget(budget)
            .build();
        assert_eq!(config.decide(0, 5, &"boom"), RetryDecision::BudgetExhausted);
    }

    #[test]
    fn event_listeners_observe_outcomes() {
        use std::sync::atomic::{AtomicU32, Ordering};
        let retries = Arc::new(AtomicU32::new(0));
        let counted = Arc::clone(&retries);
        let config = RetryConfig::<&str>::builder()
            .fixed_backoff(Duration::from_millis(1))
            .on_retry(move |_, _| {
                counted.fetch_add(1, Ordering::SeqCst);
            })
            .build();
        config.decide(0, 5, &"boom");
        config.decide(1, 5, &"boom");
        assert_eq!(retries.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn record_success_deposits_into_budget_and_emits_event() {
        use crate::budget::RetryBudgetBuilder;
        let budget = RetryBudgetBuilder::new()
            .token_bucket()
            .max_tokens(5)
            .initial_tokens(0)
            .build();
        let config = RetryConfig::<&str>::builder().budget(Arc::clone(&budget)).build();
        config.record_success(2);
        assert!(budget.balance() > 0);
    }
}
