//! The abstract delayed-message store contract.

use async_trait::async_trait;
use celeris_core::TaskMessage;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DelayedError;

/// A time-indexed holding area for messages submitted with an `eta` or
/// `countdown`, ordered by `deliver_at`.
///
/// Any driver satisfying this contract (in-memory, Redis sorted set,
/// Postgres) is an acceptable [`DelayedStore`]; only the in-memory
/// reference driver ([`crate::InMemoryDelayedStore`]) ships in this crate.
#[async_trait]
pub trait DelayedStore: Send + Sync {
    /// Inserts `message` to be delivered at `deliver_at`. Idempotent per
    /// `message.id`: a second `add` for the same id replaces the first.
    async fn add(&self, message: TaskMessage, deliver_at: DateTime<Utc>) -> Result<(), DelayedError>;

    /// Atomically claims and removes up to `batch_size` entries whose
    /// `deliver_at <= now`. Atomicity prevents two promoters from claiming
    /// the same entry.
    async fn get_due(
        &self,
        now: DateTime<Utc>,
        batch_size: usize,
    ) -> Result<Vec<TaskMessage>, DelayedError>;

    /// Cancels a delayed entry. Returns `false` if it was already promoted
    /// or never existed.
    async fn remove(&self, task_id: Uuid) -> Result<bool, DelayedError>;

    async fn pending_count(&self) -> Result<usize, DelayedError>;

    async fn next_delivery_time(&self) -> Result<Option<DateTime<Utc>>, DelayedError>;
}
