//! Progress reporting built on the shared event-listener infrastructure.
//!
//! [`ProgressReporter`] only dispatches [`TaskEvent`]s; persisting the
//! progress value into a result backend is the caller's job (typically
//! `celeris-pipeline`, which depends on both this crate and a backend).
//! Keeping the two concerns apart lets `celeris-core` stay free of a
//! dependency on any particular backend trait.

use std::time::Instant;

use uuid::Uuid;

use crate::events::{EventListener, EventListeners, ResilienceEvent};
use crate::result::Progress;
use crate::state::TaskState;

/// Events emitted over the lifetime of a task's execution.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    ProgressUpdated {
        task_id: Uuid,
        progress: Progress,
        at: Instant,
    },
    StateChanged {
        task_id: Uuid,
        from: TaskState,
        to: TaskState,
        at: Instant,
    },
    Retried {
        task_id: Uuid,
        attempt: u32,
        at: Instant,
    },
    DeadLettered {
        task_id: Uuid,
        at: Instant,
    },
    Revoked {
        task_id: Uuid,
        at: Instant,
    },
    BrokerHealth {
        healthy: bool,
        at: Instant,
    },
}

impl ResilienceEvent for TaskEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TaskEvent::ProgressUpdated { .. } => "progress_updated",
            TaskEvent::StateChanged { .. } => "state_changed",
            TaskEvent::Retried { .. } => "retried",
            TaskEvent::DeadLettered { .. } => "dead_lettered",
            TaskEvent::Revoked { .. } => "revoked",
            TaskEvent::BrokerHealth { .. } => "broker_health",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TaskEvent::ProgressUpdated { at, .. }
            | TaskEvent::StateChanged { at, .. }
            | TaskEvent::Retried { at, .. }
            | TaskEvent::DeadLettered { at, .. }
            | TaskEvent::Revoked { at, .. }
            | TaskEvent::BrokerHealth { at, .. } => *at,
        }
    }

    fn pattern_name(&self) -> &str {
        "task"
    }
}

/// Dispatches [`TaskEvent`]s to registered listeners.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    listeners: EventListeners<TaskEvent>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: EventListener<TaskEvent> + 'static,
    {
        self.listeners.add(listener);
    }

    pub fn report(&self, task_id: Uuid, progress: Progress) {
        self.listeners.emit(&TaskEvent::ProgressUpdated {
            task_id,
            progress,
            at: Instant::now(),
        });
    }

    pub fn state_changed(&self, task_id: Uuid, from: TaskState, to: TaskState) {
        self.listeners.emit(&TaskEvent::StateChanged {
            task_id,
            from,
            to,
            at: Instant::now(),
        });
    }

    pub fn retried(&self, task_id: Uuid, attempt: u32) {
        self.listeners.emit(&TaskEvent::Retried {
            task_id,
            attempt,
            at: Instant::now(),
        });
    }

    pub fn dead_lettered(&self, task_id: Uuid) {
        self.listeners.emit(&TaskEvent::DeadLettered {
            task_id,
            at: Instant::now(),
        });
    }

    pub fn revoked(&self, task_id: Uuid) {
        self.listeners.emit(&TaskEvent::Revoked {
            task_id,
            at: Instant::now(),
        });
    }

    pub fn broker_health(&self, healthy: bool) {
        self.listeners.emit(&TaskEvent::BrokerHealth {
            healthy,
            at: Instant::now(),
        });
    }
}
