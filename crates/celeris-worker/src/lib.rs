//! The worker: the consume loop that pulls deliveries off a broker and
//! runs them through the execution pipeline, the loop that promotes due
//! delayed messages back onto the broker, the beat loop that publishes
//! periodic schedule entries, and a facade that wires all three under
//! one shutdown signal.
//!
//! # Examples
//!
//! ```
//! use celeris_backend::InMemoryBackend;
//! use celeris_broker::InMemoryBroker;
//! use celeris_deadletter::InMemoryDeadLetterStore;
//! use celeris_delayed::InMemoryDelayedStore;
//! use celeris_registry::{TaskContext, TaskRegistration, TaskRegistry, TypedHandler};
//! use celeris_revocation::InMemoryRevocationStore;
//! use celeris_worker::Worker;
//! use std::sync::Arc;
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
//! let broker = Arc::new(InMemoryBroker::new());
//! let worker = Worker::builder(
//!     broker.clone(),
//!     Arc::new(InMemoryBackend::new()),
//!     registry,
//!     Arc::new(InMemoryDelayedStore::new()),
//!     Arc::new(InMemoryRevocationStore::new()),
//!     Arc::new(InMemoryDeadLetterStore::new(broker)),
//! )
//! .build();
//!
//! let shutdown = worker.shutdown_token();
//! shutdown.cancel();
//! worker.run().await;
//! # }
//! ```

mod config;
mod loop_;
mod worker;

pub use config::{WorkerConfig, WorkerConfigBuilder};
pub use loop_::WorkerLoop;
pub use worker::{Worker, WorkerBuilder};
