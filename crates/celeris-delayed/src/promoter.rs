//! Background promotion of due delayed messages back onto the broker.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use celeris_core::SharedClock;
use celeris_broker::Broker;

use crate::error::DelayedError;
use crate::trait_def::DelayedStore;

/// Wakes on a fixed interval (or sooner, if the store knows of an entry
/// due before then), drains whatever has matured, and republishes each
/// message to the broker queue it was originally addressed to.
///
/// Sleeping on `min(poll_interval, next_delivery_time - now)` keeps
/// promotion latency bounded without busy-polling a store that is mostly
/// empty.
pub struct Promoter<S, B> {
    store: Arc<S>,
    broker: Arc<B>,
    clock: SharedClock,
    poll_interval: StdDuration,
    batch_size: usize,
}

impl<S, B> Promoter<S, B>
where
    S: DelayedStore,
    B: Broker,
{
    pub fn new(store: Arc<S>, broker: Arc<B>, clock: SharedClock) -> Self {
        Self {
            store,
            broker,
            clock,
            poll_interval: StdDuration::from_secs(1),
            batch_size: 100,
        }
    }

    pub fn with_poll_interval(mut self, interval: StdDuration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Runs the promotion loop until `shutdown` resolves.
    pub async fn run(&self, mut shutdown: tokio::sync::oneshot::Receiver<()>) {
        loop {
            let sleep_for = self.next_sleep_duration().await;
            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = &mut shutdown => break,
            }
            if let Err(err) = self.promote_due().await {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %err, "delayed promotion pass failed");
                #[cfg(not(feature = "tracing"))]
                let _ = err;
            }
        }
    }

    /// Runs a single promotion pass, returning the number of messages
    /// republished. Exposed directly so callers can drive promotion from
    /// their own scheduling loop instead of [`Promoter::run`].
    pub async fn promote_due(&self) -> Result<usize, DelayedError> {
        let now = self.clock.now();
        let due = self.store.get_due(now, self.batch_size).await?;
        let promoted = due.len();
        for message in due {
            let _ = self.broker.publish(message).await;
        }
        Ok(promoted)
    }

    async fn next_sleep_duration(&self) -> StdDuration {
        let Ok(Some(next)) = self.store.next_delivery_time().await else {
            return self.poll_interval;
        };
        let now = self.clock.now();
        let until_next = (next - now)
            .to_std()
            .unwrap_or(StdDuration::ZERO);
        until_next.min(self.poll_interval)
    }
}
