//! Time limit policy: a soft, signal-only deadline and a hard, cancelling one.

use std::time::Duration;

use celeris_core::events::{EventListeners, FnListener};

use crate::events::TimeLimiterEvent;

/// `soft_limit` triggers a recoverable signal the handler may observe;
/// `hard_limit` force-cancels the run outright. Either may be absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeLimitPolicy {
    pub soft_limit: Option<Duration>,
    pub hard_limit: Option<Duration>,
}

impl TimeLimitPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn soft_limit(mut self, limit: Duration) -> Self {
        self.soft_limit = Some(limit);
        self
    }

    pub fn hard_limit(mut self, limit: Duration) -> Self {
        self.hard_limit = Some(limit);
        self
    }
}

/// Configuration for a [`crate::TimeLimiter`] instance.
pub struct TimeLimiterConfig {
    pub(crate) policy: TimeLimitPolicy,
    pub(crate) event_listeners: EventListeners<TimeLimiterEvent>,
    pub(crate) name: String,
}

/// Builder for [`TimeLimiterConfig`].
pub struct TimeLimiterConfigBuilder {
    policy: TimeLimitPolicy,
    event_listeners: EventListeners<TimeLimiterEvent>,
    name: String,
}

impl Default for TimeLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeLimiterConfigBuilder {
    pub fn new() -> Self {
        Self {
            policy: TimeLimitPolicy::default(),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    pub fn soft_limit(mut self, limit: Duration) -> Self {
        self.policy.soft_limit = Some(limit);
        self
    }

    pub fn hard_limit(mut self, limit: Duration) -> Self {
        self.policy.hard_limit = Some(limit);
        self
    }

    pub fn policy(mut self, policy: TimeLimitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_completed<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeLimiterEvent::Completed { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    pub fn on_soft_limit<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeLimiterEvent::SoftLimitReached { elapsed, .. } = event {
                f(*elapsed);
            }
        }));
        self
    }

    pub fn on_hard_limit<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeLimiterEvent::HardLimitReached { elapsed, .. } = event {
                f(*elapsed);
            }
        }));
        self
    }

    pub fn build(self) -> crate::TimeLimiter {
        crate::TimeLimiter::from_config(TimeLimiterConfig {
            policy: self.policy,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}
