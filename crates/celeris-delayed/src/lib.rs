//! A time-indexed holding area for messages submitted with an `eta` or
//! `countdown`, and a background [`Promoter`] that republishes them to the
//! broker once they mature.
//!
//! Producers never sleep to honor a delay: a message destined for the
//! future is handed to a [`DelayedStore`] instead of the broker, and the
//! promoter moves it onto its real queue when `deliver_at` arrives.
//!
//! # Examples
//!
//! ```
//! use celeris_broker::InMemoryBroker;
//! use celeris_core::{FakeClock, SharedClock, TaskMessage};
//! use celeris_delayed::{DelayedStore, InMemoryDelayedStore, Promoter};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let store = Arc::new(InMemoryDelayedStore::new());
//! let broker = Arc::new(InMemoryBroker::new());
//! let clock: SharedClock = Arc::new(FakeClock::new(chrono::Utc::now()));
//!
//! let message = TaskMessage::builder("tasks.remind", "default").build().unwrap();
//! store.add(message, clock.now() - chrono::Duration::seconds(1)).await.unwrap();
//!
//! let promoter = Promoter::new(store, broker, clock);
//! let promoted = promoter.promote_due().await.unwrap();
//! assert_eq!(promoted, 1);
//! # }
//! ```

mod error;
mod memory;
mod promoter;
mod trait_def;

pub use error::DelayedError;
pub use memory::InMemoryDelayedStore;
pub use promoter::Promoter;
pub use trait_def::DelayedStore;
