use std::time::{Duration, Instant};

use celeris_core::ResilienceEvent;

/// Events emitted while deciding whether and when to retry.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    Retry {
        pattern_name: String,
        timestamp: Instant,
        attempt: u32,
        delay: Duration,
    },
    Success {
        pattern_name: String,
        timestamp: Instant,
        attempts: u32,
    },
    Exhausted {
        pattern_name: String,
        timestamp: Instant,
        attempts: u32,
    },
    IgnoredError {
        pattern_name: String,
        timestamp: Instant,
    },
    BudgetExhausted {
        pattern_name: String,
        timestamp: Instant,
        attempt: u32,
    },
}

impl ResilienceEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::IgnoredError { .. } => "ignored_error",
            RetryEvent::BudgetExhausted { .. } => "budget_exhausted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::IgnoredError { timestamp, .. }
            | RetryEvent::BudgetExhausted { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RetryEvent::Retry { pattern_name, .. }
            | RetryEvent::Success { pattern_name, .. }
            | RetryEvent::Exhausted { pattern_name, .. }
            | RetryEvent::IgnoredError { pattern_name, .. }
            | RetryEvent::BudgetExhausted { pattern_name, .. } => pattern_name,
        }
    }
}
