//! An in-memory [`DeadLetterStore`], FIFO-capped and TTL-aware.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use celeris_broker::Broker;
use celeris_core::{Clock, SharedClock, SystemClock, TaskMessage};
use uuid::Uuid;

use crate::entry::{DeadLetterEntry, DeadLetterReason, ExceptionInfo};
use crate::error::DeadLetterError;
use crate::trait_def::DeadLetterStore;

/// Default cap on the number of held entries before the oldest is evicted
/// to make room for a new one.
pub const DEFAULT_MAX_MESSAGES: usize = 10_000;

pub struct InMemoryDeadLetterStore {
    entries: Mutex<VecDeque<DeadLetterEntry>>,
    broker: Arc<dyn Broker>,
    clock: SharedClock,
    max_messages: usize,
    default_ttl: Option<chrono::Duration>,
}

impl InMemoryDeadLetterStore {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            broker,
            clock: Arc::new(SystemClock),
            max_messages: DEFAULT_MAX_MESSAGES,
            default_ttl: None,
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages;
        self
    }

    pub fn with_default_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }
}

#[async_trait]
impl DeadLetterStore for InMemoryDeadLetterStore {
    async fn put(
        &self,
        task_id: Uuid,
        task_name: String,
        queue: String,
        original_payload: Vec<u8>,
        reason: DeadLetterReason,
        exception: ExceptionInfo,
    ) -> Result<Uuid, DeadLetterError> {
        let now = self.clock.now();
        let entry = DeadLetterEntry {
            id: Uuid::new_v4(),
            task_id,
            task_name,
            queue,
            original_payload,
            reason,
            exception,
            timestamp: now,
            expires_at: self.default_ttl.map(|ttl| now + ttl),
        };
        let id = entry.id;

        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= self.max_messages {
            entries.pop_front();
        }
        entries.push_back(entry);
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<DeadLetterEntry>, DeadLetterError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|entry| entry.id == id)
            .cloned())
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<DeadLetterEntry>, DeadLetterError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn requeue(&self, id: Uuid) -> Result<(), DeadLetterError> {
        let entry = {
            let mut entries = self.entries.lock().unwrap();
            let position = entries
                .iter()
                .position(|entry| entry.id == id)
                .ok_or(DeadLetterError::NotFound { id })?;
            entries.remove(position).unwrap()
        };

        let message: TaskMessage =
            serde_json::from_slice(&entry.original_payload).map_err(|err| {
                DeadLetterError::Unavailable {
                    message: format!("stored payload is not a valid task message: {err}"),
                }
            })?;

        self.broker
            .publish(message)
            .await
            .map_err(|err| DeadLetterError::Unavailable {
                message: err.to_string(),
            })
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DeadLetterError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.iter().position(|entry| entry.id == id) {
            Some(position) => {
                entries.remove(position);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge(&self) -> Result<usize, DeadLetterError> {
        let mut entries = self.entries.lock().unwrap();
        let count = entries.len();
        entries.clear();
        Ok(count)
    }

    async fn cleanup_expired(&self) -> Result<usize, DeadLetterError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }
}
