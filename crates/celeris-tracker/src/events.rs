use std::time::Instant;

use celeris_core::ResilienceEvent;

/// Events emitted by [`crate::ExecutionTracker`] as leases are acquired and released.
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    LeaseAcquired {
        pattern_name: String,
        timestamp: Instant,
        task_name: String,
        key: String,
    },
    LeaseRejected {
        pattern_name: String,
        timestamp: Instant,
        task_name: String,
        key: String,
    },
    LeaseReleased {
        pattern_name: String,
        timestamp: Instant,
        task_name: String,
        key: String,
    },
}

impl ResilienceEvent for TrackerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TrackerEvent::LeaseAcquired { .. } => "lease_acquired",
            TrackerEvent::LeaseRejected { .. } => "lease_rejected",
            TrackerEvent::LeaseReleased { .. } => "lease_released",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TrackerEvent::LeaseAcquired { timestamp, .. }
            | TrackerEvent::LeaseRejected { timestamp, .. }
            | TrackerEvent::LeaseReleased { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            TrackerEvent::LeaseAcquired { pattern_name, .. }
            | TrackerEvent::LeaseRejected { pattern_name, .. }
            | TrackerEvent::LeaseReleased { pattern_name, .. } => pattern_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types() {
        let event = TrackerEvent::LeaseAcquired {
            pattern_name: "tracker".to_string(),
            timestamp: Instant::now(),
            task_name: "tasks.render".to_string(),
            key: "report-42".to_string(),
        };
        assert_eq!(event.event_type(), "lease_acquired");
    }
}
