//! A task registration: a name bound to a handler plus its policies.

use std::sync::Arc;

use celeris_ratelimiter::RateLimitPolicy;
use celeris_timelimiter::TimeLimitPolicy;
use serde_json::Value;

use crate::filter::BoxedFilter;
use crate::handler::Handler;

/// Derives the overlap-prevention key from a task's decoded arguments.
pub type OverlapKeyFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// A task name bound to its handler and the policies that govern how the
/// pipeline runs it: an optional queue override, rate limit, time limit,
/// overlap prevention, and ordered filter chain.
pub struct TaskRegistration {
    pub task_name: String,
    pub handler: Arc<dyn Handler>,
    pub queue: Option<String>,
    pub rate_limit_policy: Option<RateLimitPolicy>,
    pub time_limit_policy: Option<TimeLimitPolicy>,
    pub prevent_overlapping: bool,
    pub overlap_key_fn: Option<OverlapKeyFn>,
    pub filters: Vec<BoxedFilter>,
}

impl TaskRegistration {
    pub fn builder(task_name: impl Into<String>, handler: Arc<dyn Handler>) -> RegistrationBuilder {
        RegistrationBuilder::new(task_name, handler)
    }

    /// The overlap key for a given decoded input: either the configured
    /// extractor's result, or the task name alone when overlap prevention
    /// doesn't key off a specific field.
    pub fn overlap_key(&self, args: &Value) -> Option<String> {
        if !self.prevent_overlapping {
            return None;
        }
        Some(match &self.overlap_key_fn {
            Some(f) => f(args),
            None => self.task_name.clone(),
        })
    }
}

pub struct RegistrationBuilder {
    task_name: String,
    handler: Arc<dyn Handler>,
    queue: Option<String>,
    rate_limit_policy: Option<RateLimitPolicy>,
    time_limit_policy: Option<TimeLimitPolicy>,
    prevent_overlapping: bool,
    overlap_key_fn: Option<OverlapKeyFn>,
    filters: Vec<BoxedFilter>,
}

impl RegistrationBuilder {
    fn new(task_name: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        Self {
            task_name: task_name.into(),
            handler,
            queue: None,
            rate_limit_policy: None,
            time_limit_policy: None,
            prevent_overlapping: false,
            overlap_key_fn: None,
            filters: Vec::new(),
        }
    }

    pub fn queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    pub fn rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit_policy = Some(policy);
        self
    }

    pub fn time_limit(mut self, policy: TimeLimitPolicy) -> Self {
        self.time_limit_policy = Some(policy);
        self
    }

    pub fn prevent_overlapping(mut self) -> Self {
        self.prevent_overlapping = true;
        self
    }

    pub fn overlap_key_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.prevent_overlapping = true;
        self.overlap_key_fn = Some(Arc::new(f));
        self
    }

    pub fn filter(mut self, filter: BoxedFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn build(self) -> TaskRegistration {
        let mut filters = self.filters;
        filters.sort_by_key(|f| f.order());
        TaskRegistration {
            task_name: self.task_name,
            handler: self.handler,
            queue: self.queue,
            rate_limit_policy: self.rate_limit_policy,
            time_limit_policy: self.time_limit_policy,
            prevent_overlapping: self.prevent_overlapping,
            overlap_key_fn: self.overlap_key_fn,
            filters,
        }
    }
}
