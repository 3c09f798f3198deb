//! An in-memory [`RevocationStore`].

use async_trait::async_trait;
use celeris_core::{Clock, SharedClock, SystemClock};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::RevocationError;
use crate::record::{RevocationOptions, RevocationRecord};
use crate::trait_def::RevocationStore;

/// `dashmap`-backed TTL map. Expired entries are lazily evicted on lookup;
/// there is no background sweep, consistent with how [`celeris_tracker`]
/// treats lease expiry.
pub struct InMemoryRevocationStore {
    entries: DashMap<Uuid, RevocationRecord>,
    clock: SharedClock,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }
}

impl Default for InMemoryRevocationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(
        &self,
        task_id: Uuid,
        options: RevocationOptions,
    ) -> Result<(), RevocationError> {
        let record = RevocationRecord::new(self.clock.now(), options);
        self.entries.insert(task_id, record);
        Ok(())
    }

    async fn get(&self, task_id: Uuid) -> Result<Option<RevocationRecord>, RevocationError> {
        let now = self.clock.now();
        let expired = match self.entries.get(&task_id) {
            Some(record) if !record.is_expired(now) => return Ok(Some(record.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(&task_id);
        }
        Ok(None)
    }
}
