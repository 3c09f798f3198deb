//! Pipeline-wide configuration: the resilience knobs that drive retry
//! backoff and the lock timeouts used by the partition and overlap gates.
//!
//! Security configuration lives in [`crate::security::SecurityConfig`] and
//! is composed in here rather than duplicated.

use std::time::Duration;

use crate::security::SecurityConfig;

/// `enable_retry` turns the whole retry path off (every handler failure
/// dead-letters immediately) independent of any individual message's
/// `max_retries`. `initial_delay`/`max_delay`/`backoff_multiplier` feed
/// directly into the exponential backoff used to schedule requeues.
#[derive(Debug, Clone, Copy)]
pub struct ResilienceConfig {
    pub enable_retry: bool,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            enable_retry: true,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(600),
            backoff_multiplier: 2.0,
        }
    }
}

impl ResilienceConfig {
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::new()
    }
}

pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl Default for ResilienceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResilienceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ResilienceConfig::default(),
        }
    }

    pub fn enable_retry(mut self, enabled: bool) -> Self {
        self.config.enable_retry = enabled;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.config.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.config.backoff_multiplier = multiplier;
        self
    }

    pub fn build(self) -> ResilienceConfig {
        self.config
    }
}

/// Top-level configuration for a [`crate::Pipeline`].
#[derive(Clone)]
pub struct PipelineConfig {
    pub security: SecurityConfig,
    pub resilience: ResilienceConfig,
    pub partition_lock_timeout: Duration,
    pub overlap_lock_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            security: SecurityConfig::default(),
            resilience: ResilienceConfig::default(),
            partition_lock_timeout: Duration::from_secs(300),
            overlap_lock_timeout: Duration::from_secs(300),
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }
}

pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    pub fn security(mut self, security: SecurityConfig) -> Self {
        self.config.security = security;
        self
    }

    pub fn resilience(mut self, resilience: ResilienceConfig) -> Self {
        self.config.resilience = resilience;
        self
    }

    pub fn partition_lock_timeout(mut self, timeout: Duration) -> Self {
        self.config.partition_lock_timeout = timeout;
        self
    }

    pub fn overlap_lock_timeout(mut self, timeout: Duration) -> Self {
        self.config.overlap_lock_timeout = timeout;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}
