//! The abstract broker contract.

use async_trait::async_trait;
use celeris_core::TaskMessage;
use futures::stream::BoxStream;

use crate::error::BrokerError;
use crate::message::BrokerMessage;

/// Publish/consume/ack/reject over named queues, plus a liveness probe.
///
/// Any driver satisfying this contract (in-memory, Redis, Postgres,
/// RabbitMQ) is an acceptable [`Broker`]; only the in-memory reference
/// driver ([`crate::InMemoryBroker`]) ships in this crate.
///
/// Implementations must provide at-least-once delivery: a consumed-but-
/// unacked message becomes visible again after a driver-specific visibility
/// timeout, and concurrent consumers on the same queue observe disjoint
/// messages.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Appends `message` to `message.queue`. Safe to call concurrently.
    async fn publish(&self, message: TaskMessage) -> Result<(), BrokerError>;

    /// A fair, infinite stream of messages drawn from `queues`. The stream
    /// ends only on drop or broker shutdown.
    fn consume(&self, queues: Vec<String>) -> BoxStream<'static, BrokerMessage>;

    /// Completes a delivery; it will not be redelivered.
    async fn ack(&self, msg: &BrokerMessage) -> Result<(), BrokerError>;

    /// Returns a delivery to its queue (if `requeue`) or drops it.
    async fn reject(&self, msg: &BrokerMessage, requeue: bool) -> Result<(), BrokerError>;

    /// Liveness probe.
    async fn health(&self) -> bool;
}
