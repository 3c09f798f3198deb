//! Worker-level configuration: which queues to draw from, how much
//! concurrent dispatch to allow, and how long to wait for in-flight work
//! on shutdown.

use std::time::Duration;

/// `prefetch` is carried for interface completeness (the configuration
/// surface names it as a driver-specific knob) but the in-memory broker
/// has no concept of prefetch batching. A real network driver would use
/// it to size how many unacked deliveries it holds locally.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub queues: Vec<String>,
    pub max_concurrency: usize,
    pub prefetch: usize,
    pub shutdown_grace_period: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queues: vec!["default".to_string()],
            max_concurrency: 10,
            prefetch: 10,
            shutdown_grace_period: Duration::from_secs(30),
        }
    }
}

impl WorkerConfig {
    pub fn builder() -> WorkerConfigBuilder {
        WorkerConfigBuilder::new()
    }
}

pub struct WorkerConfigBuilder {
    config: WorkerConfig,
}

impl Default for WorkerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: WorkerConfig::default(),
        }
    }

    pub fn queue(mut self, queue: impl Into<String>) -> Self {
        self.config.queues.push(queue.into());
        self
    }

    pub fn queues(mut self, queues: Vec<String>) -> Self {
        self.config.queues = queues;
        self
    }

    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.config.max_concurrency = max;
        self
    }

    pub fn prefetch(mut self, prefetch: usize) -> Self {
        self.config.prefetch = prefetch;
        self
    }

    pub fn shutdown_grace_period(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace_period = grace;
        self
    }

    pub fn build(self) -> WorkerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_consume_the_default_queue() {
        let config = WorkerConfig::default();
        assert_eq!(config.queues, vec!["default".to_string()]);
        assert_eq!(config.max_concurrency, 10);
    }

    #[test]
    fn builder_appends_additional_queues() {
        let config = WorkerConfig::builder().queue("priority").build();
        assert_eq!(config.queues, vec!["default".to_string(), "priority".to_string()]);
    }

    #[test]
    fn builder_overrides_queue_list_wholesale() {
        let config = WorkerConfig::builder()
            .queues(vec!["a".to_string(), "b".to_string()])
            .max_concurrency(4)
            .shutdown_grace_period(Duration::from_secs(5))
            .build();
        assert_eq!(config.queues, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.shutdown_grace_period, Duration::from_secs(5));
    }
}
