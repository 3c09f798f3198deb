//! Overlap prevention and partition ordering for task execution.
//!
//! [`ExecutionTracker`] hands out time-bounded leases keyed by
//! `(task_name, key)`, used to stop the same logical unit of work from
//! running concurrently (overlap prevention) and, via [`PartitionGate`], to
//! serialize execution of messages sharing a `partition_key`.
//!
//! Leases expire on their own TTL, so a crashed worker never wedges a key
//! permanently: a later `try_start` for the same `(task_name, key)` simply
//! sees an expired record and proceeds.
//!
//! # Examples
//!
//! ```
//! use celeris_tracker::ExecutionTracker;
//! use uuid::Uuid;
//! use std::time::Duration;
//!
//! let tracker = ExecutionTracker::builder().build();
//! let task_id = Uuid::new_v4();
//!
//! assert!(tracker.try_start("tasks.render", task_id, Some("report-42"), Duration::from_secs(30)));
//! // a second, different task_id for the same key is rejected until the lease expires or stops
//! assert!(!tracker.try_start("tasks.render", Uuid::new_v4(), Some("report-42"), Duration::from_secs(30)));
//! tracker.stop("tasks.render", task_id, Some("report-42"));
//! ```

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use celeris_core::events::EventListeners;
use celeris_core::SharedClock;

mod config;
mod error;
mod events;

pub use config::ExecutionTrackerBuilder;
pub use error::TrackerError;
pub use events::TrackerEvent;

#[derive(Debug, Clone)]
struct Lease {
    task_id: Uuid,
    started_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Key used when a caller doesn't supply one (overlap prevention keyed
/// purely on `task_name`).
const DEFAULT_KEY: &str = "";

/// A dashmap-backed lease table enforcing "only one in-flight run per
/// `(task_name, key)` at a time".
pub struct ExecutionTracker {
    leases: DashMap<(String, String), Lease>,
    name: String,
    clock: SharedClock,
    event_listeners: EventListeners<TrackerEvent>,
}

impl ExecutionTracker {
    pub fn builder() -> ExecutionTrackerBuilder {
        ExecutionTrackerBuilder::new()
    }

    pub(crate) fn from_parts(
        name: String,
        clock: SharedClock,
        event_listeners: EventListeners<TrackerEvent>,
    ) -> Self {
        Self {
            leases: DashMap::new(),
            name,
            clock,
            event_listeners,
        }
    }

    fn map_key(task_name: &str, key: Option<&str>) -> (String, String) {
        (task_name.to_string(), key.unwrap_or(DEFAULT_KEY).to_string())
    }

    /// Attempts to acquire the lease for `(task_name, key)`. Succeeds when no
    /// record exists, the existing record has expired, or the existing
    /// record already belongs to `task_id` (re-entrant).
    pub fn try_start(
        &self,
        task_name: &str,
        task_id: Uuid,
        key: Option<&str>,
        timeout: Duration,
    ) -> bool {
        let map_key = Self::map_key(task_name, key);
        let now = self.clock.now();
        let expires_at = now
            + chrono::Duration::from_std(timeout).unwrap_or_else(|_| chrono::Duration::zero());

        let acquired = match self.leases.entry(map_key.clone()) {
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(Lease {
                    task_id,
                    started_at: now,
                    expires_at,
                });
                true
            }
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                let lease = entry.get();
                if lease.task_id == task_id || lease.expires_at <= now {
                    entry.insert(Lease {
                        task_id,
                        started_at: now,
                        expires_at,
                    });
                    true
                } else {
                    false
                }
            }
        };

        let event = if acquired {
            TrackerEvent::LeaseAcquired {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                task_name: map_key.0,
                key: map_key.1,
            }
        } else {
            TrackerEvent::LeaseRejected {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                task_name: map_key.0,
                key: map_key.1,
            }
        };
        self.event_listeners.emit(&event);
        acquired
    }

    /// Releases the lease iff `task_id` matches the record currently held,
    /// so one worker can never release another's lock.
    pub fn stop(&self, task_name: &str, task_id: Uuid, key: Option<&str>) {
        let map_key = Self::map_key(task_name, key);
        let removed = self
            .leases
            .remove_if(&map_key, |_, lease| lease.task_id == task_id)
            .is_some();

        if removed {
            self.event_listeners.emit(&TrackerEvent::LeaseReleased {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                task_name: map_key.0,
                key: map_key.1,
            });
        }
    }

    /// Renews the TTL on an existing lease owned by `task_id`. Returns
    /// `false` if no matching lease is held (it expired or was never
    /// acquired).
    pub fn extend(
        &self,
        task_name: &str,
        task_id: Uuid,
        key: Option<&str>,
        extension: Duration,
    ) -> bool {
        let map_key = Self::map_key(task_name, key);
        let now = self.clock.now();
        let mut extended = false;
        if let Some(mut lease) = self.leases.get_mut(&map_key) {
            if lease.task_id == task_id {
                lease.expires_at = now
                    + chrono::Duration::from_std(extension)
                        .unwrap_or_else(|_| chrono::Duration::zero());
                extended = true;
            }
        }
        extended
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for ExecutionTracker {
    fn default() -> Self {
        Self::builder().build()
    }
}

const PARTITION_NAMESPACE: &str = "__partition__";

/// Serializes execution across messages sharing a `partition_key`, backed
/// by the same lease mechanism as [`ExecutionTracker`] under a fixed
/// task-name namespace.
pub struct PartitionGate {
    tracker: ExecutionTracker,
}

impl PartitionGate {
    pub fn new() -> Self {
        Self {
            tracker: ExecutionTracker::builder().name("partition-gate").build(),
        }
    }

    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            tracker: ExecutionTracker::builder()
                .name("partition-gate")
                .clock(clock)
                .build(),
        }
    }

    pub fn try_acquire(&self, task_id: Uuid, partition_key: &str, timeout: Duration) -> bool {
        self.tracker
            .try_start(PARTITION_NAMESPACE, task_id, Some(partition_key), timeout)
    }

    pub fn release(&self, task_id: Uuid, partition_key: &str) {
        self.tracker
            .stop(PARTITION_NAMESPACE, task_id, Some(partition_key));
    }
}

impl Default for PartitionGate {
    fn default() -> Self {
        Self::new()
    }
}
