//! The per-message execution pipeline: the stage that sits between a
//! worker's consume loop and a registered task handler.
//!
//! [`Pipeline::dispatch`] runs one delivered message through security
//! validation, revocation and expiry checks, registry lookup, the
//! partition/overlap/rate gates, the filter chain, the handler itself
//! under a time limit, and finally resolves the outcome into a state
//! transition plus an ack, a delayed requeue, a retry, or a dead letter.
//! Every call acks or rejects its delivery exactly once.
//!
//! # Examples
//!
//! ```
//! use celeris_backend::InMemoryBackend;
//! use celeris_broker::InMemoryBroker;
//! use celeris_deadletter::InMemoryDeadLetterStore;
//! use celeris_delayed::InMemoryDelayedStore;
//! use celeris_pipeline::Pipeline;
//! use celeris_registry::{TaskContext, TaskRegistration, TaskRegistry, TypedHandler};
//! use celeris_revocation::InMemoryRevocationStore;
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
//! let pipeline = Pipeline::new(
//!     broker.clone(),
//!     Arc::new(InMemoryBackend::new()),
//!     registry,
//!     Arc::new(InMemoryDelayedStore::new()),
//!     Arc::new(InMemoryRevocationStore::new()),
//!     Arc::new(InMemoryDeadLetterStore::new(broker)),
//! );
//! let _ = pipeline;
//! # }
//! ```

mod config;
mod error;
mod pipeline;
mod security;

pub use config::{PipelineConfig, PipelineConfigBuilder, ResilienceConfig, ResilienceConfigBuilder};
pub use error::SecurityError;
pub use pipeline::{DispatchOutcome, Pipeline};
pub use security::{SecurityConfig, SecurityConfigBuilder, SecurityGate, SIGNATURE_HEADER};
