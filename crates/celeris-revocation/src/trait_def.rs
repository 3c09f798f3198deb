//! The abstract revocation store contract.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RevocationError;
use crate::record::{RevocationOptions, RevocationRecord};

/// Tracks revoked task ids with a TTL, consulted by the pipeline before
/// dispatch and, for tasks already executing, by a revocation watcher.
///
/// Any driver satisfying this contract (in-memory, Redis) is an
/// acceptable [`RevocationStore`]; only the in-memory reference driver
/// ([`crate::InMemoryRevocationStore`]) ships in this crate.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Records a revocation. Idempotent: revoking an already-revoked id
    /// refreshes its options and TTL.
    async fn revoke(
        &self,
        task_id: Uuid,
        options: RevocationOptions,
    ) -> Result<(), RevocationError>;

    /// Whether `task_id` is currently revoked (and not expired).
    async fn is_revoked(&self, task_id: Uuid) -> Result<bool, RevocationError> {
        Ok(self.get(task_id).await?.is_some())
    }

    /// The full revocation record, if any and not expired.
    async fn get(&self, task_id: Uuid) -> Result<Option<RevocationRecord>, RevocationError>;
}
