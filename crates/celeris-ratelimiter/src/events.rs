//! Events emitted by the rate limiter for observability.

use std::time::{Duration, Instant};

use celeris_core::ResilienceEvent;

/// Events emitted when a caller attempts to acquire a permit.
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    PermitAcquired {
        resource_key: String,
        remaining: u64,
        timestamp: Instant,
    },
    PermitRejected {
        resource_key: String,
        retry_after: Duration,
        timestamp: Instant,
    },
}

impl ResilienceEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::PermitAcquired { .. } => "permit_acquired",
            RateLimiterEvent::PermitRejected { .. } => "permit_rejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::PermitAcquired { timestamp, .. } => *timestamp,
            RateLimiterEvent::PermitRejected { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RateLimiterEvent::PermitAcquired { resource_key, .. } => resource_key,
            RateLimiterEvent::PermitRejected { resource_key, .. } => resource_key,
        }
    }
}
