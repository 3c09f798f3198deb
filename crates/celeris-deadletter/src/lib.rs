//! A holding area for terminally-undeliverable task messages, with FIFO
//! capping, optional TTL expiry, and an operator-facing requeue/delete/purge
//! surface.
//!
//! # Examples
//!
//! ```
//! use celeris_broker::InMemoryBroker;
//! use celeris_core::TaskMessage;
//! use celeris_deadletter::{DeadLetterReason, DeadLetterStore, ExceptionInfo, InMemoryDeadLetterStore};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let broker = Arc::new(InMemoryBroker::new());
//! let store = InMemoryDeadLetterStore::new(broker);
//!
//! let message = TaskMessage::builder("tasks.send", "default").build().unwrap();
//! let payload = serde_json::to_vec(&message).unwrap();
//! let id = store
//!     .put(message.id, "tasks.send".into(), "default".into(), payload, DeadLetterReason::MaxRetriesExceeded, ExceptionInfo::default())
//!     .await
//!     .unwrap();
//! assert!(store.get(id).await.unwrap().is_some());
//! # }
//! ```

mod entry;
mod error;
mod memory;
mod trait_def;

pub use entry::{DeadLetterEntry, DeadLetterReason, ExceptionInfo};
pub use error::DeadLetterError;
pub use memory::{InMemoryDeadLetterStore, DEFAULT_MAX_MESSAGES};
pub use trait_def::DeadLetterStore;
