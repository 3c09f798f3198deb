//! Errors surfaced by [`crate::Broker`] implementations.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    #[error("queue {queue} is closed")]
    QueueClosed { queue: String },

    #[error("delivery {delivery_tag} is unknown or already settled")]
    UnknownDelivery { delivery_tag: uuid::Uuid },

    #[error("broker unavailable: {message}")]
    Unavailable { message: String },
}
