//! Revocation: marks task ids as cancelled, with a TTL so the store never
//! grows unbounded, a `terminate` flag distinguishing "don't start" from
//! "stop if running", and a cancellation signal for tasks already mid-flight.
//!
//! # Examples
//!
//! ```
//! use celeris_revocation::{InMemoryRevocationStore, RevocationOptions, RevocationStore};
//! use uuid::Uuid;
//!
//! # async fn example() {
//! let store = InMemoryRevocationStore::new();
//! let task_id = Uuid::new_v4();
//! store.revoke(task_id, RevocationOptions::default()).await.unwrap();
//! assert!(store.is_revoked(task_id).await.unwrap());
//! # }
//! ```

mod error;
mod memory;
mod record;
mod trait_def;

pub use error::RevocationError;
pub use memory::InMemoryRevocationStore;
pub use record::{CancelSignal, RevocationOptions, RevocationRecord, DEFAULT_EXPIRY};
pub use trait_def::RevocationStore;
