//! Configuration for [`crate::ExecutionTracker`].

use std::sync::Arc;

use celeris_core::events::{EventListeners, FnListener};
use celeris_core::{Clock, SystemClock};

use crate::events::TrackerEvent;

/// Builder for an [`crate::ExecutionTracker`].
pub struct ExecutionTrackerBuilder {
    name: String,
    clock: Arc<dyn Clock>,
    event_listeners: EventListeners<TrackerEvent>,
}

impl Default for ExecutionTrackerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionTrackerBuilder {
    pub fn new() -> Self {
        Self {
            name: "tracker".to_string(),
            clock: Arc::new(SystemClock),
            event_listeners: EventListeners::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Overrides the clock used for lease expiry. Tests inject a
    /// [`celeris_core::FakeClock`] here to control lease expiry deterministically.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn on_lease_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TrackerEvent::LeaseAcquired {
                task_name, key, ..
            } = event
            {
                f(task_name, key);
            }
        }));
        self
    }

    pub fn on_lease_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TrackerEvent::LeaseRejected {
                task_name, key, ..
            } = event
            {
                f(task_name, key);
            }
        }));
        self
    }

    pub fn on_lease_released<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TrackerEvent::LeaseReleased {
                task_name, key, ..
            } = event
            {
                f(task_name, key);
            }
        }));
        self
    }

    pub fn build(self) -> crate::ExecutionTracker {
        crate::ExecutionTracker::from_parts(self.name, self.clock, self.event_listeners)
    }
}
