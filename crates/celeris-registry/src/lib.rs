//! Task registration, the type-erased handler invoker, and the per-call
//! [`TaskContext`].
//!
//! Registration is explicit, not reflection-based: a task name is bound to
//! a typed handler closure via [`TaskRegistration::builder`], and the
//! registry that results from [`TaskRegistry::builder`] is built once at
//! startup and never mutated again, so looking a task up on the hot path
//! never takes a lock.
//!
//! # Examples
//!
//! ```
//! use celeris_registry::{Invoker, TaskContext, TaskRegistration, TaskRegistry, TypedHandler};
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! # async fn example() {
//! let handler = Arc::new(TypedHandler::new(
//!     "tasks.add",
//!     |input: (i64, i64), _ctx: TaskContext| async move {
//!         Ok::<i64, celeris_registry::HandlerError>(input.0 + input.1)
//!     },
//! ));
//! let registry = Arc::new(
//!     TaskRegistry::builder()
//!         .register(TaskRegistration::builder("tasks.add", handler).build())
//!         .unwrap()
//!         .build(),
//! );
//!
//! let invoker = Invoker::new(registry);
//! let ctx = TaskContext::new(Uuid::new_v4(), "tasks.add", 0);
//! let result = invoker.invoke("tasks.add", serde_json::json!((2, 3)), ctx).await.unwrap();
//! assert_eq!(result, serde_json::json!(5));
//! # }
//! ```

mod context;
mod error;
mod filter;
mod handler;
mod invoker;
mod registration;
mod registry;

pub use context::TaskContext;
pub use error::RegistryError;
pub use filter::{BoxedFilter, Filter, FilterOutcome};
pub use handler::{Handler, HandlerError, TypedHandler};
pub use invoker::Invoker;
pub use registration::{OverlapKeyFn, RegistrationBuilder, TaskRegistration};
pub use registry::{TaskRegistry, TaskRegistryBuilder};
