use std::time::{Duration, Instant};

use celeris_core::ResilienceEvent;

/// Events emitted while enforcing soft/hard time limits on a running task.
#[derive(Debug, Clone)]
pub enum TimeLimiterEvent {
    /// The handler completed before either limit elapsed.
    Completed {
        pattern_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// The soft limit elapsed; the handler was signaled but left running.
    SoftLimitReached {
        pattern_name: String,
        timestamp: Instant,
        elapsed: Duration,
    },
    /// The hard limit elapsed; the handler was force-cancelled.
    HardLimitReached {
        pattern_name: String,
        timestamp: Instant,
        elapsed: Duration,
    },
}

impl ResilienceEvent for TimeLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TimeLimiterEvent::Completed { .. } => "completed",
            TimeLimiterEvent::SoftLimitReached { .. } => "soft_limit_reached",
            TimeLimiterEvent::HardLimitReached { .. } => "hard_limit_reached",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TimeLimiterEvent::Completed { timestamp, .. }
            | TimeLimiterEvent::SoftLimitReached { timestamp, .. }
            | TimeLimiterEvent::HardLimitReached { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            TimeLimiterEvent::Completed { pattern_name, .. }
            | TimeLimiterEvent::SoftLimitReached { pattern_name, .. }
            | TimeLimiterEvent::HardLimitReached { pattern_name, .. } => pattern_name,
        }
    }
}
