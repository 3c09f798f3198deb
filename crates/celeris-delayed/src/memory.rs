//! An in-memory [`DelayedStore`] sufficient for tests and single-process
//! use.
//!
//! Entries live in a `BinaryHeap` ordered by `deliver_at` (soonest first).
//! A side index tracks each message id's current `deliver_at` so a second
//! `add` for the same id can supersede the first without a heap removal:
//! the stale heap entry is simply skipped (a tombstone check) when it
//! eventually surfaces in `get_due`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Mutex;

use async_trait::async_trait;
use celeris_core::TaskMessage;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::DelayedError;
use crate::trait_def::DelayedStore;

struct Entry {
    deliver_at: DateTime<Utc>,
    message: TaskMessage,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deliver_at == other.deliver_at
    }
}
impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the soonest entry first.
        other.deliver_at.cmp(&self.deliver_at)
    }
}

/// In-process reference delayed store.
#[derive(Default)]
pub struct InMemoryDelayedStore {
    heap: Mutex<BinaryHeap<Entry>>,
    index: DashMap<Uuid, DateTime<Utc>>,
}

impl InMemoryDelayedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DelayedStore for InMemoryDelayedStore {
    async fn add(
        &self,
        message: TaskMessage,
        deliver_at: DateTime<Utc>,
    ) -> Result<(), DelayedError> {
        self.index.insert(message.id, deliver_at);
        self.heap.lock().unwrap().push(Entry {
            deliver_at,
            message,
        });
        Ok(())
    }

    async fn get_due(
        &self,
        now: DateTime<Utc>,
        batch_size: usize,
    ) -> Result<Vec<TaskMessage>, DelayedError> {
        let mut due = Vec::new();
        let mut heap = self.heap.lock().unwrap();

        while due.len() < batch_size {
            let Some(top) = heap.peek() else { break };
            if top.deliver_at > now {
                break;
            }
            let entry = heap.pop().unwrap();

            // A tombstone: this id was re-added (or removed) after this
            // entry was pushed, so the current index no longer agrees.
            match self.index.get(&entry.message.id) {
                Some(current) if *current == entry.deliver_at => {
                    drop(current);
                    self.index.remove(&entry.message.id);
                    due.push(entry.message);
                }
                _ => continue,
            }
        }

        Ok(due)
    }

    async fn remove(&self, task_id: Uuid) -> Result<bool, DelayedError> {
        Ok(self.index.remove(&task_id).is_some())
    }

    async fn pending_count(&self) -> Result<usize, DelayedError> {
        Ok(self.index.len())
    }

    async fn next_delivery_time(&self) -> Result<Option<DateTime<Utc>>, DelayedError> {
        // The heap's head may be a tombstone; scan until a live entry is
        // found without mutating the heap.
        let heap = self.heap.lock().unwrap();
        Ok(heap
            .iter()
            .filter(|entry| {
                self.index
                    .get(&entry.message.id)
                    .is_some_and(|current| *current == entry.deliver_at)
            })
            .map(|entry| entry.deliver_at)
            .min())
    }
}
