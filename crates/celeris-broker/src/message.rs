//! The envelope a [`crate::Broker`] hands to a consumer.

use chrono::{DateTime, Utc};
use celeris_core::TaskMessage;
use uuid::Uuid;

/// A message pulled off a queue, unacknowledged until [`crate::Broker::ack`]
/// or [`crate::Broker::reject`] is called with its `delivery_tag`.
#[derive(Debug, Clone)]
pub struct BrokerMessage {
    pub message: TaskMessage,
    pub delivery_tag: Uuid,
    pub queue: String,
    pub received_at: DateTime<Utc>,
}
