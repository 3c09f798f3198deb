//! The result backend contract: store/fetch/await results and task state.
//!
//! [`Backend`] is the abstract contract every driver (Redis, Postgres, or
//! this crate's [`InMemoryBackend`]) must satisfy. `wait_for_result` is the
//! per-task rendezvous submitters block on.
//!
//! # Examples
//!
//! ```
//! use celeris_backend::{Backend, InMemoryBackend};
//! use celeris_core::{TaskResult, TaskState};
//! use uuid::Uuid;
//!
//! # async fn example() {
//! let backend = InMemoryBackend::new();
//! let task_id = Uuid::new_v4();
//! let mut result = TaskResult::pending(task_id);
//! result.state = TaskState::Success;
//!
//! backend.store_result(result, None).await.unwrap();
//! let fetched = backend.get_result(task_id).await.unwrap().unwrap();
//! assert_eq!(fetched.state, TaskState::Success);
//! # }
//! ```

mod error;
mod memory;
mod trait_def;

pub use error::BackendError;
pub use memory::InMemoryBackend;
pub use trait_def::Backend;
