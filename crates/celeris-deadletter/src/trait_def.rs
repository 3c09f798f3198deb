//! The abstract dead-letter store contract.

use async_trait::async_trait;
use uuid::Uuid;

use crate::entry::{DeadLetterEntry, DeadLetterReason, ExceptionInfo};
use crate::error::DeadLetterError;

/// A durable holding area for terminally-undeliverable messages.
///
/// Any driver satisfying this contract (in-memory, Redis, Postgres) is
/// an acceptable [`DeadLetterStore`]; only the in-memory reference driver
/// ([`crate::InMemoryDeadLetterStore`]) ships in this crate.
#[async_trait]
pub trait DeadLetterStore: Send + Sync {
    /// Records a new dead-lettered message. Implementations enforce a
    /// `max_messages` cap with FIFO eviction of the oldest entry.
    async fn put(
        &self,
        task_id: Uuid,
        task_name: String,
        queue: String,
        original_payload: Vec<u8>,
        reason: DeadLetterReason,
        exception: ExceptionInfo,
    ) -> Result<Uuid, DeadLetterError>;

    async fn get(&self, id: Uuid) -> Result<Option<DeadLetterEntry>, DeadLetterError>;

    /// Entries ordered oldest-first, paginated.
    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<DeadLetterEntry>, DeadLetterError>;

    /// Re-publishes `id`'s original payload to the broker on its original
    /// queue and removes it from this store.
    async fn requeue(&self, id: Uuid) -> Result<(), DeadLetterError>;

    async fn delete(&self, id: Uuid) -> Result<bool, DeadLetterError>;

    async fn purge(&self) -> Result<usize, DeadLetterError>;

    /// Removes entries whose `expires_at` has passed. Returns the count
    /// removed.
    async fn cleanup_expired(&self) -> Result<usize, DeadLetterError>;
}
