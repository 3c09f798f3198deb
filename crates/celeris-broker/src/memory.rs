//! An in-memory [`Broker`] sufficient for tests and single-process use.
//!
//! Queues are unbounded mpsc channels created lazily on first publish or
//! consume. Because `mpsc::UnboundedReceiver` has exactly one owner, only
//! one active `consume` call per queue name is supported at a time,
//! matching the single-consumer-group shape most in-process task queues
//! actually run with. This driver does not implement a visibility timeout:
//! rejecting without requeue simply drops the message, and there is no
//! redelivery-on-crash story beyond what `reject(.., requeue: true)` gives.

use std::sync::Arc;

use async_trait::async_trait;
use celeris_core::TaskMessage;
use chrono::Utc;
use dashmap::DashMap;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::error::BrokerError;
use crate::message::BrokerMessage;
use crate::trait_def::Broker;

struct Queue {
    sender: mpsc::UnboundedSender<TaskMessage>,
    receiver: std::sync::Mutex<Option<mpsc::UnboundedReceiver<TaskMessage>>>,
}

/// In-process reference broker backed by one `mpsc` channel per queue name.
pub struct InMemoryBroker {
    queues: DashMap<String, Arc<Queue>>,
    unacked: Arc<DashMap<Uuid, BrokerMessage>>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self {
            queues: DashMap::new(),
            unacked: Arc::new(DashMap::new()),
        }
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue_for(&self, name: &str) -> Arc<Queue> {
        self.queues
            .entry(name.to_string())
            .or_insert_with(|| {
                let (sender, receiver) = mpsc::unbounded_channel();
                Arc::new(Queue {
                    sender,
                    receiver: std::sync::Mutex::new(Some(receiver)),
                })
            })
            .clone()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn publish(&self, message: TaskMessage) -> Result<(), BrokerError> {
        let queue = self.queue_for(&message.queue);
        queue
            .sender
            .send(message)
            .map_err(|_| BrokerError::QueueClosed {
                queue: "unknown".to_string(),
            })
    }

    fn consume(&self, queues: Vec<String>) -> BoxStream<'static, BrokerMessage> {
        let streams: Vec<_> = queues
            .into_iter()
            .filter_map(|name| {
                let queue = self.queue_for(&name);
                let receiver = queue.receiver.lock().unwrap().take()?;
                let unacked = Arc::clone(&self.unacked);
                Some(
                    UnboundedReceiverStream::new(receiver)
                        .map(move |message| {
                            let broker_message = BrokerMessage {
                                message,
                                delivery_tag: Uuid::new_v4(),
                                queue: name.clone(),
                                received_at: Utc::now(),
                            };
                            unacked.insert(broker_message.delivery_tag, broker_message.clone());
                            broker_message
                        })
                        .boxed(),
                )
            })
            .collect();

        futures::stream::select_all(streams).boxed()
    }

    async fn ack(&self, msg: &BrokerMessage) -> Result<(), BrokerError> {
        self.unacked
            .remove(&msg.delivery_tag)
            .map(|_| ())
            .ok_or(BrokerError::UnknownDelivery {
                delivery_tag: msg.delivery_tag,
            })
    }

    async fn reject(&self, msg: &BrokerMessage, requeue: bool) -> Result<(), BrokerError> {
        self.unacked
            .remove(&msg.delivery_tag)
            .ok_or(BrokerError::UnknownDelivery {
                delivery_tag: msg.delivery_tag,
            })?;
        if requeue {
            self.publish(msg.message.clone()).await?;
        }
        Ok(())
    }

    async fn health(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use celeris_core::TaskMessage;

    fn message(task: &str, queue: &str) -> TaskMessage {
        TaskMessage::builder(task, queue).build().unwrap()
    }

    #[tokio::test]
    async fn publish_then_consume_roundtrips() {
        let broker = InMemoryBroker::new();
        broker.publish(message("tasks.echo", "default")).await.unwrap();

        let mut stream = broker.consume(vec!["default".to_string()]);
        let received = stream.next().await.unwrap();
        assert_eq!(received.message.task_name, "tasks.echo");
        broker.ack(&received).await.unwrap();
    }

    #[tokio::test]
    async fn reject_with_requeue_redelivers() {
        let broker = InMemoryBroker::new();
        broker.publish(message("tasks.echo", "default")).await.unwrap();

        let mut stream = broker.consume(vec!["default".to_string()]);
        let received = stream.next().await.unwrap();
        broker.reject(&received, true).await.unwrap();

        let redelivered = stream.next().await.unwrap();
        assert_eq!(redelivered.message.id, received.message.id);
    }

    #[tokio::test]
    async fn reject_without_requeue_drops() {
        let broker = InMemoryBroker::new();
        broker.publish(message("tasks.echo", "default")).await.unwrap();
        broker.publish(message("tasks.echo", "default")).await.unwrap();

        let mut stream = broker.consume(vec!["default".to_string()]);
        let first = stream.next().await.unwrap();
        broker.reject(&first, false).await.unwrap();

        let second = stream.next().await.unwrap();
        assert_ne!(second.delivery_tag, first.delivery_tag);
    }

    #[tokio::test]
    async fn consume_is_fair_across_queues() {
        let broker = InMemoryBroker::new();
        for _ in 0..3 {
            broker.publish(message("tasks.a", "a")).await.unwrap();
            broker.publish(message("tasks.b", "b")).await.unwrap();
        }

        let mut stream = broker.consume(vec!["a".to_string(), "b".to_string()]);
        let mut seen_a = 0;
        let mut seen_b = 0;
        for _ in 0..6 {
            match stream.next().await.unwrap().queue.as_str() {
                "a" => seen_a += 1,
                "b" => seen_b += 1,
                other => panic!("unexpected queue {other}"),
            }
        }
        assert_eq!(seen_a, 3);
        assert_eq!(seen_b, 3);
    }

    #[tokio::test]
    async fn health_reports_true() {
        let broker = InMemoryBroker::new();
        assert!(broker.health().await);
    }
}
