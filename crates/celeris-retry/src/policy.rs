//! A retry policy pairs a backoff strategy with an optional predicate that
//! filters which errors are worth retrying at all.

use std::sync::Arc;
use std::time::Duration;

use crate::backoff::IntervalFunction;

/// A predicate deciding whether a given error should be retried.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Combines a backoff strategy with an optional retry predicate.
#[derive(Clone)]
pub struct RetryPolicy<E> {
    interval: Arc<dyn IntervalFunction>,
    predicate: Option<RetryPredicate<E>>,
}

impl<E> RetryPolicy<E> {
    pub fn new(interval: Arc<dyn IntervalFunction>) -> Self {
        Self {
            interval,
            predicate: None,
        }
    }

    pub fn with_predicate(mut self, predicate: RetryPredicate<E>) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Whether `error` should be retried. Defaults to `true` when no
    /// predicate is configured.
    pub fn should_retry(&self, error: &E) -> bool {
        match &self.predicate {
            Some(predicate) => predicate(error),
            None => true,
        }
    }

    pub fn next_backoff(&self, attempt: u32) -> Duration {
        self.interval.interval(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::FixedInterval;

    #[test]
    fn defaults_to_retrying_everything() {
        let policy: RetryPolicy<&str> =
            RetryPolicy::new(Arc::new(FixedInterval::new(Duration::from_millis(10))));
        assert!(policy.should_retry(&"anything"));
    }

    #[test]
    fn predicate_filters_errors() {
        let policy: RetryPolicy<&str> =
            RetryPolicy::new(Arc::new(FixedInterval::new(Duration::from_millis(10))))
                .with_predicate(Arc::new(|e: &&str| *e != "fatal"));
        assert!(policy.should_retry(&"transient"));
        assert!(!policy.should_retry(&"fatal"));
    }

    #[test]
    fn next_backoff_delegates_to_interval() {
        let policy: RetryPolicy<&str> =
            RetryPolicy::new(Arc::new(FixedInterval::new(Duration::from_millis(250))));
        assert_eq!(policy.next_backoff(0), Duration::from_millis(250));
    }
}
