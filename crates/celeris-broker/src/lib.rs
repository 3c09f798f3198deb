//! The broker contract: publish/consume/ack/reject over named queues.
//!
//! [`Broker`] is the abstract contract every driver (Redis, RabbitMQ,
//! Postgres, or this crate's [`InMemoryBroker`]) must satisfy. The worker
//! and pipeline crates depend only on `Arc<dyn Broker>`.
//!
//! # Examples
//!
//! ```
//! use celeris_broker::{Broker, InMemoryBroker};
//! use celeris_core::TaskMessage;
//! use futures::StreamExt;
//!
//! # async fn example() {
//! let broker = InMemoryBroker::new();
//! let message = TaskMessage::builder("tasks.echo", "default").build().unwrap();
//! broker.publish(message).await.unwrap();
//!
//! let mut stream = broker.consume(vec!["default".to_string()]);
//! let delivered = stream.next().await.unwrap();
//! broker.ack(&delivered).await.unwrap();
//! # }
//! ```

mod error;
mod memory;
mod message;
mod trait_def;

pub use error::BrokerError;
pub use memory::InMemoryBroker;
pub use message::BrokerMessage;
pub use trait_def::Broker;
